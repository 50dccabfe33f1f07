// service/bid_service.rs
use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::{
    db::{
        biddb::{BidExt, BID_COLUMNS},
        db::DBClient,
        requestdb::{RequestExt, REQUEST_COLUMNS},
    },
    dtos::biddtos::{normalize_comment, CreateBidDto, UpdateBidDto},
    models::{
        bidmodel::{Bid, BidStatus},
        chatmodel::Chat,
        requestmodel::{CargoRequest, RequestStatus},
        usermodel::{User, UserRole},
    },
    service::{
        error::ServiceError,
        realtime::{ChangeKind, RealtimeHub, Table},
    },
};

/// Everything the accept cascade touched, as committed.
#[derive(Debug, Clone, Serialize)]
pub struct AcceptedBid {
    pub bid: Bid,
    pub request: CargoRequest,
    pub rejected: Vec<Bid>,
    pub chat: Chat,
}

pub fn ensure_can_bid(user: &User, request: &CargoRequest) -> Result<(), ServiceError> {
    if user.role != UserRole::Carrier {
        return Err(ServiceError::NotACarrier);
    }
    if request.shipper_id == user.id {
        return Err(ServiceError::OwnRequest);
    }
    if !request.status.accepts_bids() {
        return Err(ServiceError::InvalidRequestStatus(request.id, request.status));
    }
    Ok(())
}

/// Checks that `user_id` may accept or reject `bid` on `request`.
pub fn ensure_can_respond(user_id: Uuid, request: &CargoRequest, bid: &Bid) -> Result<(), ServiceError> {
    if bid.request_id != request.id {
        return Err(ServiceError::BidNotFound(bid.id));
    }
    if request.shipper_id != user_id {
        return Err(ServiceError::NotRequestOwner(user_id, request.id));
    }
    if request.accepted_carrier_id.is_some() {
        return Err(ServiceError::AlreadyAccepted(request.id));
    }
    if !request.status.accepts_bids() {
        return Err(ServiceError::InvalidRequestStatus(request.id, request.status));
    }
    if bid.status != BidStatus::Pending {
        return Err(ServiceError::InvalidBidStatus(bid.id, bid.status));
    }
    Ok(())
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

#[derive(Debug, Clone)]
pub struct BidService {
    db_client: Arc<DBClient>,
    realtime: RealtimeHub,
}

impl BidService {
    pub fn new(db_client: Arc<DBClient>, realtime: RealtimeHub) -> Self {
        Self { db_client, realtime }
    }

    async fn load_bid(&self, bid_id: Uuid) -> Result<Bid, ServiceError> {
        self.db_client
            .get_bid(bid_id)
            .await?
            .ok_or(ServiceError::BidNotFound(bid_id))
    }

    async fn load_request(&self, request_id: Uuid) -> Result<CargoRequest, ServiceError> {
        self.db_client
            .get_request(request_id)
            .await?
            .ok_or(ServiceError::RequestNotFound(request_id))
    }

    /// The bid as it is now, for reporting a lost race.
    async fn stale_bid(&self, bid_id: Uuid) -> ServiceError {
        match self.db_client.get_bid(bid_id).await {
            Ok(Some(bid)) => ServiceError::InvalidBidStatus(bid.id, bid.status),
            Ok(None) => ServiceError::BidNotFound(bid_id),
            Err(err) => err.into(),
        }
    }

    async fn stale_request(&self, request_id: Uuid) -> ServiceError {
        match self.db_client.get_request(request_id).await {
            Ok(Some(request)) => ServiceError::InvalidRequestStatus(request.id, request.status),
            Ok(None) => ServiceError::RequestNotFound(request_id),
            Err(err) => err.into(),
        }
    }

    pub async fn submit_bid(
        &self,
        carrier: &User,
        request_id: Uuid,
        body: CreateBidDto,
    ) -> Result<Bid, ServiceError> {
        let request = self.load_request(request_id).await?;
        ensure_can_bid(carrier, &request)?;

        let existing = self
            .db_client
            .get_bids_for_request(request_id, Some(carrier.id))
            .await?;
        if existing.iter().any(|b| b.bid.status == BidStatus::Pending) {
            return Err(ServiceError::DuplicateBid(request_id));
        }

        let created = self
            .db_client
            .create_bid(request_id, carrier.id, body.amount, normalize_comment(body.comment))
            .await;

        let bid = match created {
            Ok(Some(bid)) => bid,
            Ok(None) => return Err(self.stale_request(request_id).await),
            Err(err) if is_unique_violation(&err) => return Err(ServiceError::DuplicateBid(request_id)),
            Err(err) => return Err(err.into()),
        };

        tracing::info!("carrier {} bid {} on request {}", carrier.id, bid.amount, request_id);
        self.realtime.publish(Table::Bids, ChangeKind::Insert, &bid);

        Ok(bid)
    }

    pub async fn update_bid(
        &self,
        carrier_id: Uuid,
        bid_id: Uuid,
        body: UpdateBidDto,
    ) -> Result<Bid, ServiceError> {
        let bid = self.load_bid(bid_id).await?;
        if bid.carrier_id != carrier_id {
            return Err(ServiceError::NotBidOwner(carrier_id, bid_id));
        }
        if bid.status != BidStatus::Pending {
            return Err(ServiceError::InvalidBidStatus(bid_id, bid.status));
        }

        let updated = self
            .db_client
            .update_bid(bid_id, body.amount, normalize_comment(body.comment))
            .await?;

        let bid = match updated {
            Some(bid) => bid,
            None => {
                // either the bid left pending or the request closed meanwhile
                let current = self.load_bid(bid_id).await?;
                if current.status != BidStatus::Pending {
                    return Err(ServiceError::InvalidBidStatus(bid_id, current.status));
                }
                return Err(self.stale_request(current.request_id).await);
            }
        };

        self.realtime.publish(Table::Bids, ChangeKind::Update, &bid);
        Ok(bid)
    }

    pub async fn withdraw_bid(&self, carrier_id: Uuid, bid_id: Uuid) -> Result<Bid, ServiceError> {
        let bid = self.load_bid(bid_id).await?;
        if bid.carrier_id != carrier_id {
            return Err(ServiceError::NotBidOwner(carrier_id, bid_id));
        }
        if !bid.status.can_transition_to(BidStatus::Withdrawn) {
            return Err(ServiceError::InvalidBidStatus(bid_id, bid.status));
        }

        let bid = match self
            .db_client
            .update_bid_status(bid_id, BidStatus::Pending, BidStatus::Withdrawn)
            .await?
        {
            Some(bid) => bid,
            None => return Err(self.stale_bid(bid_id).await),
        };

        tracing::info!("bid {} withdrawn by carrier {}", bid_id, carrier_id);
        self.realtime.publish(Table::Bids, ChangeKind::Update, &bid);
        Ok(bid)
    }

    pub async fn reject_bid(&self, shipper_id: Uuid, bid_id: Uuid) -> Result<Bid, ServiceError> {
        let bid = self.load_bid(bid_id).await?;
        let request = self.load_request(bid.request_id).await?;
        ensure_can_respond(shipper_id, &request, &bid)?;

        let bid = match self
            .db_client
            .update_bid_status(bid_id, BidStatus::Pending, BidStatus::Rejected)
            .await?
        {
            Some(bid) => bid,
            None => return Err(self.stale_bid(bid_id).await),
        };

        tracing::info!("bid {} rejected on request {}", bid_id, request.id);
        self.realtime.publish(Table::Bids, ChangeKind::Update, &bid);
        Ok(bid)
    }

    /// Accepts `bid_id`, rejects its pending siblings, moves the request to
    /// `in_progress` and opens the chat, all in one transaction.
    pub async fn accept_bid(&self, shipper_id: Uuid, bid_id: Uuid) -> Result<AcceptedBid, ServiceError> {
        let request_id = self.load_bid(bid_id).await?.request_id;

        let mut tx = self.db_client.pool.begin().await?;

        // request first, then bid: every writer on this request locks in this order
        let request = sqlx::query_as::<_, CargoRequest>(&format!(
            "SELECT {} FROM requests WHERE id = $1 FOR UPDATE",
            REQUEST_COLUMNS
        ))
        .bind(request_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(ServiceError::RequestNotFound(request_id))?;

        let bid = sqlx::query_as::<_, Bid>(&format!(
            "SELECT {} FROM bids WHERE id = $1 FOR UPDATE",
            BID_COLUMNS
        ))
        .bind(bid_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(ServiceError::BidNotFound(bid_id))?;

        ensure_can_respond(shipper_id, &request, &bid)?;

        let accepted = sqlx::query_as::<_, Bid>(&format!(
            r#"
            UPDATE bids
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            BID_COLUMNS
        ))
        .bind(bid_id)
        .bind(BidStatus::Accepted)
        .fetch_one(&mut *tx)
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                ServiceError::AlreadyAccepted(request_id)
            } else {
                err.into()
            }
        })?;

        let rejected = sqlx::query_as::<_, Bid>(&format!(
            r#"
            UPDATE bids
            SET status = $3, updated_at = NOW()
            WHERE request_id = $1 AND id <> $2 AND status = $4
            RETURNING {}
            "#,
            BID_COLUMNS
        ))
        .bind(request_id)
        .bind(bid_id)
        .bind(BidStatus::Rejected)
        .bind(BidStatus::Pending)
        .fetch_all(&mut *tx)
        .await?;

        let request = sqlx::query_as::<_, CargoRequest>(&format!(
            r#"
            UPDATE requests
            SET status = $2, accepted_carrier_id = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            REQUEST_COLUMNS
        ))
        .bind(request_id)
        .bind(RequestStatus::InProgress)
        .bind(accepted.carrier_id)
        .fetch_one(&mut *tx)
        .await?;

        let chat = sqlx::query_as::<_, Chat>(
            r#"
            INSERT INTO chats (request_id, bid_id)
            VALUES ($1, $2)
            RETURNING id, request_id, bid_id, created_at, updated_at
            "#,
        )
        .bind(request_id)
        .bind(bid_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO chat_participants (chat_id, user_id)
            VALUES ($1, $2), ($1, $3)
            "#,
        )
        .bind(chat.id)
        .bind(request.shipper_id)
        .bind(accepted.carrier_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            "bid {} accepted on request {}, {} competing bids rejected, chat {} opened",
            bid_id,
            request_id,
            rejected.len(),
            chat.id
        );

        self.realtime.publish(Table::Bids, ChangeKind::Update, &accepted);
        self.realtime.publish_all(Table::Bids, ChangeKind::Update, &rejected);
        self.realtime.publish(Table::Requests, ChangeKind::Update, &request);
        self.realtime.publish(Table::Chats, ChangeKind::Insert, &chat);

        Ok(AcceptedBid {
            bid: accepted,
            request,
            rejected,
            chat,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::{NaiveDate, Utc};
    use sqlx::{types::BigDecimal, PgPool};

    use super::*;
    use crate::{
        db::{chatdb::ChatExt, userdb::UserExt},
        dtos::requestdtos::CreateRequestDto,
        models::requestmodel::WagonType,
    };

    fn user(role: UserRole) -> User {
        User {
            id: Uuid::new_v4(),
            email: "dispatch@uralrail.ru".to_string(),
            password: String::new(),
            full_name: "Irina Sokolova".to_string(),
            role,
            company_name: Some("Ural Rail".to_string()),
            phone: None,
            reset_token: None,
            reset_token_expires_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn request(shipper_id: Uuid, status: RequestStatus) -> CargoRequest {
        CargoRequest {
            id: Uuid::new_v4(),
            shipper_id,
            title: None,
            origin: "Yekaterinburg".to_string(),
            destination: "Novorossiysk".to_string(),
            cargo_description: "Coal, 68t per wagon".to_string(),
            wagon_type: WagonType::Gondola,
            wagon_count: 12,
            loading_date: NaiveDate::from_ymd_opt(2026, 11, 3).unwrap(),
            target_price: BigDecimal::from(1_450_000),
            status,
            accepted_carrier_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn bid(request_id: Uuid, carrier_id: Uuid, status: BidStatus) -> Bid {
        Bid {
            id: Uuid::new_v4(),
            request_id,
            carrier_id,
            amount: BigDecimal::from(1_390_000),
            comment: None,
            status,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn only_carriers_bid_on_open_requests_of_others() {
        let shipper = user(UserRole::Shipper);
        let carrier = user(UserRole::Carrier);
        let open = request(shipper.id, RequestStatus::Open);

        assert!(ensure_can_bid(&carrier, &open).is_ok());
        assert!(matches!(ensure_can_bid(&shipper, &open), Err(ServiceError::NotACarrier)));
        assert!(matches!(ensure_can_bid(&user(UserRole::Admin), &open), Err(ServiceError::NotACarrier)));

        let own = request(carrier.id, RequestStatus::Open);
        assert!(matches!(ensure_can_bid(&carrier, &own), Err(ServiceError::OwnRequest)));

        let closed = request(shipper.id, RequestStatus::InProgress);
        assert!(matches!(
            ensure_can_bid(&carrier, &closed),
            Err(ServiceError::InvalidRequestStatus(_, RequestStatus::InProgress))
        ));
    }

    #[test]
    fn owner_responds_to_pending_bid() {
        let shipper = user(UserRole::Shipper);
        let carrier = user(UserRole::Carrier);
        let open = request(shipper.id, RequestStatus::Open);
        let pending = bid(open.id, carrier.id, BidStatus::Pending);

        assert!(ensure_can_respond(shipper.id, &open, &pending).is_ok());
        assert!(matches!(
            ensure_can_respond(carrier.id, &open, &pending),
            Err(ServiceError::NotRequestOwner(_, _))
        ));
    }

    #[test]
    fn cannot_respond_to_settled_bid() {
        let shipper = user(UserRole::Shipper);
        let open = request(shipper.id, RequestStatus::Open);
        let withdrawn = bid(open.id, Uuid::new_v4(), BidStatus::Withdrawn);

        let err = ensure_can_respond(shipper.id, &open, &withdrawn).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidBidStatus(_, BidStatus::Withdrawn)));
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn second_accept_conflicts() {
        let shipper = user(UserRole::Shipper);
        let mut taken = request(shipper.id, RequestStatus::InProgress);
        taken.accepted_carrier_id = Some(Uuid::new_v4());
        let late = bid(taken.id, Uuid::new_v4(), BidStatus::Pending);

        let err = ensure_can_respond(shipper.id, &taken, &late).unwrap_err();
        assert!(matches!(err, ServiceError::AlreadyAccepted(_)));
        assert_eq!(err.status_code(), axum::http::StatusCode::CONFLICT);
    }

    #[test]
    fn bid_from_another_request_is_not_found() {
        let shipper = user(UserRole::Shipper);
        let open = request(shipper.id, RequestStatus::Open);
        let stray = bid(Uuid::new_v4(), Uuid::new_v4(), BidStatus::Pending);

        assert!(matches!(
            ensure_can_respond(shipper.id, &open, &stray),
            Err(ServiceError::BidNotFound(_))
        ));
    }

    #[test]
    fn cancelled_request_cannot_be_responded_to() {
        let shipper = user(UserRole::Shipper);
        let cancelled = request(shipper.id, RequestStatus::Cancelled);
        let pending = bid(cancelled.id, Uuid::new_v4(), BidStatus::Pending);

        assert!(matches!(
            ensure_can_respond(shipper.id, &cancelled, &pending),
            Err(ServiceError::InvalidRequestStatus(_, RequestStatus::Cancelled))
        ));
    }

    fn bid_service(pool: PgPool) -> (Arc<DBClient>, BidService) {
        let db_client = Arc::new(DBClient::new(pool));
        let service = BidService::new(db_client.clone(), RealtimeHub::new(64));
        (db_client, service)
    }

    async fn member(db: &DBClient, email: &str, role: UserRole) -> User {
        db.save_user(email, "not-a-real-hash", "Test Member", role, None, None)
            .await
            .unwrap()
    }

    async fn open_request(db: &DBClient, shipper: &User) -> CargoRequest {
        let body = CreateRequestDto {
            title: None,
            origin: "Chelyabinsk".to_string(),
            destination: "Ust-Luga".to_string(),
            cargo_description: "Steel coils".to_string(),
            wagon_type: WagonType::Flatcar,
            wagon_count: 8,
            loading_date: NaiveDate::from_ymd_opt(2026, 11, 20).unwrap(),
            target_price: BigDecimal::from(900_000),
        };
        db.create_request(shipper.id, &body).await.unwrap()
    }

    fn offer(amount: i64) -> CreateBidDto {
        CreateBidDto {
            amount: BigDecimal::from(amount),
            comment: None,
        }
    }

    struct Market {
        db: Arc<DBClient>,
        service: BidService,
        shipper: User,
        carriers: Vec<User>,
        request: CargoRequest,
        bids: Vec<Bid>,
    }

    /// One open request with a pending bid from each of three carriers.
    async fn market(pool: PgPool) -> Market {
        let (db, service) = bid_service(pool);
        let shipper = member(&db, "shipper@railmatch.test", UserRole::Shipper).await;
        let request = open_request(&db, &shipper).await;

        let mut carriers = Vec::new();
        let mut bids = Vec::new();
        for (n, amount) in [870_000, 880_000, 890_000].into_iter().enumerate() {
            let carrier = member(&db, &format!("carrier{}@railmatch.test", n), UserRole::Carrier).await;
            bids.push(service.submit_bid(&carrier, request.id, offer(amount)).await.unwrap());
            carriers.push(carrier);
        }

        Market { db, service, shipper, carriers, request, bids }
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "Requires a Postgres DATABASE_URL"]
    async fn accept_rejects_the_rest_and_opens_a_chat(pool: PgPool) {
        let m = market(pool).await;
        m.service.withdraw_bid(m.carriers[2].id, m.bids[2].id).await.unwrap();

        let accepted = m.service.accept_bid(m.shipper.id, m.bids[0].id).await.unwrap();

        assert_eq!(accepted.bid.status, BidStatus::Accepted);
        assert_eq!(accepted.request.status, RequestStatus::InProgress);
        assert_eq!(accepted.request.accepted_carrier_id, Some(m.carriers[0].id));
        assert_eq!(accepted.rejected.len(), 1);
        assert_eq!(accepted.rejected[0].id, m.bids[1].id);
        assert_eq!(accepted.chat.bid_id, Some(m.bids[0].id));

        let loser = m.db.get_bid(m.bids[1].id).await.unwrap().unwrap();
        assert_eq!(loser.status, BidStatus::Rejected);
        let withdrawn = m.db.get_bid(m.bids[2].id).await.unwrap().unwrap();
        assert_eq!(withdrawn.status, BidStatus::Withdrawn);

        let mut members: Vec<Uuid> = m
            .db
            .get_chat_participants(accepted.chat.id)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.user_id)
            .collect();
        members.sort();
        let mut expected = vec![m.shipper.id, m.carriers[0].id];
        expected.sort();
        assert_eq!(members, expected);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "Requires a Postgres DATABASE_URL"]
    async fn failed_accept_leaves_nothing_behind(pool: PgPool) {
        let m = market(pool).await;

        // a stray chat on the bid makes the chat insert fail at the very end
        sqlx::query("INSERT INTO chats (request_id, bid_id) VALUES ($1, $2)")
            .bind(m.request.id)
            .bind(m.bids[0].id)
            .execute(&m.db.pool)
            .await
            .unwrap();

        let err = m.service.accept_bid(m.shipper.id, m.bids[0].id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Database(_)));

        let request = m.db.get_request(m.request.id).await.unwrap().unwrap();
        assert_eq!(request.status, RequestStatus::Open);
        assert_eq!(request.accepted_carrier_id, None);
        for bid in &m.bids {
            let bid = m.db.get_bid(bid.id).await.unwrap().unwrap();
            assert_eq!(bid.status, BidStatus::Pending);
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "Requires a Postgres DATABASE_URL"]
    async fn only_one_bid_is_ever_accepted(pool: PgPool) {
        let m = market(pool).await;
        m.service.accept_bid(m.shipper.id, m.bids[0].id).await.unwrap();

        let err = m.service.accept_bid(m.shipper.id, m.bids[1].id).await.unwrap_err();
        assert!(matches!(err, ServiceError::AlreadyAccepted(_)));

        let err = sqlx::query("UPDATE bids SET status = 'accepted' WHERE id = $1")
            .bind(m.bids[1].id)
            .execute(&m.db.pool)
            .await
            .unwrap_err();
        assert!(is_unique_violation(&err));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "Requires a Postgres DATABASE_URL"]
    async fn one_pending_bid_per_carrier(pool: PgPool) {
        let m = market(pool).await;
        let carrier = &m.carriers[0];

        let err = m.service.submit_bid(carrier, m.request.id, offer(860_000)).await.unwrap_err();
        assert!(matches!(err, ServiceError::DuplicateBid(_)));

        let err = m
            .db
            .create_bid(m.request.id, carrier.id, BigDecimal::from(850_000), None)
            .await
            .unwrap_err();
        assert!(is_unique_violation(&err));

        m.service.withdraw_bid(carrier.id, m.bids[0].id).await.unwrap();
        let again = m.service.submit_bid(carrier, m.request.id, offer(860_000)).await.unwrap();
        assert_eq!(again.status, BidStatus::Pending);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "Requires a Postgres DATABASE_URL"]
    async fn bid_racing_an_accept_is_not_left_pending(pool: PgPool) {
        let m = market(pool).await;
        let late_carrier = member(&m.db, "late@railmatch.test", UserRole::Carrier).await;

        // hold the request the way accept_bid does
        let mut tx = m.db.pool.begin().await.unwrap();
        sqlx::query("SELECT id FROM requests WHERE id = $1 FOR UPDATE")
            .bind(m.request.id)
            .execute(&mut *tx)
            .await
            .unwrap();

        let db = m.db.clone();
        let request_id = m.request.id;
        let racing = tokio::spawn(async move {
            db.create_bid(request_id, late_carrier.id, BigDecimal::from(800_000), None).await
        });
        tokio::time::sleep(Duration::from_millis(200)).await;

        sqlx::query("UPDATE bids SET status = 'rejected' WHERE request_id = $1 AND status = 'pending'")
            .bind(m.request.id)
            .execute(&mut *tx)
            .await
            .unwrap();
        sqlx::query("UPDATE requests SET status = 'in_progress' WHERE id = $1")
            .bind(m.request.id)
            .execute(&mut *tx)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert!(racing.await.unwrap().unwrap().is_none());

        let pending: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM bids WHERE request_id = $1 AND status = 'pending'",
        )
        .bind(m.request.id)
        .fetch_one(&m.db.pool)
        .await
        .unwrap();
        assert_eq!(pending, 0);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "Requires a Postgres DATABASE_URL"]
    async fn bids_freeze_once_the_request_is_taken(pool: PgPool) {
        let m = market(pool).await;
        m.service.accept_bid(m.shipper.id, m.bids[0].id).await.unwrap();

        let newcomer = member(&m.db, "newcomer@railmatch.test", UserRole::Carrier).await;
        let err = m.service.submit_bid(&newcomer, m.request.id, offer(700_000)).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidRequestStatus(_, RequestStatus::InProgress)));

        let edit = UpdateBidDto {
            amount: Some(BigDecimal::from(1)),
            comment: None,
        };
        let err = m.service.update_bid(m.carriers[1].id, m.bids[1].id, edit).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidBidStatus(_, BidStatus::Rejected)));
    }
}
