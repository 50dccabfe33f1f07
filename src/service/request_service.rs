// service/request_service.rs
use std::sync::Arc;

use uuid::Uuid;

use crate::{
    db::{
        biddb::{BidExt, BID_COLUMNS},
        db::DBClient,
        requestdb::{RequestExt, REQUEST_COLUMNS},
    },
    dtos::requestdtos::{CreateRequestDto, RequestDetailDto, UpdateRequestDto},
    models::{
        bidmodel::{Bid, BidStatus},
        requestmodel::{CargoRequest, RequestStatus},
        usermodel::{User, UserRole},
    },
    service::{
        error::ServiceError,
        realtime::{ChangeKind, RealtimeHub, Table},
    },
};

/// Which bids of a request a viewer gets to see.
#[derive(Debug, PartialEq, Eq)]
pub enum BidVisibility {
    All,
    OwnOnly(Uuid),
    None,
}

pub fn bid_visibility(viewer: &User, request: &CargoRequest) -> Result<BidVisibility, ServiceError> {
    if viewer.role == UserRole::Admin || viewer.id == request.shipper_id {
        return Ok(BidVisibility::All);
    }
    if viewer.role == UserRole::Carrier {
        return Ok(BidVisibility::OwnOnly(viewer.id));
    }
    if request.status == RequestStatus::Open {
        return Ok(BidVisibility::None);
    }
    Err(ServiceError::NotRequestOwner(viewer.id, request.id))
}

pub fn ensure_owner(user_id: Uuid, request: &CargoRequest) -> Result<(), ServiceError> {
    if request.shipper_id != user_id {
        return Err(ServiceError::NotRequestOwner(user_id, request.id));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct RequestService {
    db_client: Arc<DBClient>,
    realtime: RealtimeHub,
}

impl RequestService {
    pub fn new(db_client: Arc<DBClient>, realtime: RealtimeHub) -> Self {
        Self { db_client, realtime }
    }

    async fn load_request(&self, request_id: Uuid) -> Result<CargoRequest, ServiceError> {
        self.db_client
            .get_request(request_id)
            .await?
            .ok_or(ServiceError::RequestNotFound(request_id))
    }

    async fn stale_request(&self, request_id: Uuid) -> ServiceError {
        match self.db_client.get_request(request_id).await {
            Ok(Some(request)) => ServiceError::InvalidRequestStatus(request.id, request.status),
            Ok(None) => ServiceError::RequestNotFound(request_id),
            Err(err) => err.into(),
        }
    }

    pub async fn create_request(
        &self,
        shipper: &User,
        body: &CreateRequestDto,
    ) -> Result<CargoRequest, ServiceError> {
        let request = self.db_client.create_request(shipper.id, body).await?;

        tracing::info!(
            "request {} posted by {}: {} -> {}",
            request.id,
            shipper.id,
            request.origin,
            request.destination
        );
        self.realtime.publish(Table::Requests, ChangeKind::Insert, &request);

        Ok(request)
    }

    pub async fn get_request_detail(
        &self,
        viewer: &User,
        request_id: Uuid,
    ) -> Result<RequestDetailDto, ServiceError> {
        let request = self.load_request(request_id).await?;

        let bids = match bid_visibility(viewer, &request)? {
            BidVisibility::All => self.db_client.get_bids_for_request(request_id, None).await?,
            BidVisibility::OwnOnly(carrier_id) => {
                self.db_client
                    .get_bids_for_request(request_id, Some(carrier_id))
                    .await?
            }
            BidVisibility::None => Vec::new(),
        };

        Ok(RequestDetailDto { request, bids })
    }

    pub async fn update_request(
        &self,
        shipper_id: Uuid,
        request_id: Uuid,
        body: &UpdateRequestDto,
    ) -> Result<CargoRequest, ServiceError> {
        if body.is_empty() {
            return Err(ServiceError::Validation("Nothing to update".to_string()));
        }

        let request = self.load_request(request_id).await?;
        ensure_owner(shipper_id, &request)?;
        if request.status != RequestStatus::Open {
            return Err(ServiceError::InvalidRequestStatus(request_id, request.status));
        }

        let request = match self.db_client.update_request(request_id, body).await? {
            Some(request) => request,
            None => return Err(self.stale_request(request_id).await),
        };

        self.realtime.publish(Table::Requests, ChangeKind::Update, &request);
        Ok(request)
    }

    /// Cancels an open request and closes its pending bids.
    pub async fn cancel_request(
        &self,
        shipper_id: Uuid,
        request_id: Uuid,
    ) -> Result<(CargoRequest, Vec<Bid>), ServiceError> {
        let mut tx = self.db_client.pool.begin().await?;

        let request = sqlx::query_as::<_, CargoRequest>(&format!(
            "SELECT {} FROM requests WHERE id = $1 FOR UPDATE",
            REQUEST_COLUMNS
        ))
        .bind(request_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(ServiceError::RequestNotFound(request_id))?;

        ensure_owner(shipper_id, &request)?;
        if !request.status.can_transition_to(RequestStatus::Cancelled) {
            return Err(ServiceError::InvalidRequestStatus(request_id, request.status));
        }

        let request = sqlx::query_as::<_, CargoRequest>(&format!(
            r#"
            UPDATE requests
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            REQUEST_COLUMNS
        ))
        .bind(request_id)
        .bind(RequestStatus::Cancelled)
        .fetch_one(&mut *tx)
        .await?;

        let cancelled = sqlx::query_as::<_, Bid>(&format!(
            r#"
            UPDATE bids
            SET status = $2, updated_at = NOW()
            WHERE request_id = $1 AND status = $3
            RETURNING {}
            "#,
            BID_COLUMNS
        ))
        .bind(request_id)
        .bind(BidStatus::Cancelled)
        .bind(BidStatus::Pending)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            "request {} cancelled, {} pending bids closed",
            request_id,
            cancelled.len()
        );
        self.realtime.publish(Table::Requests, ChangeKind::Update, &request);
        self.realtime.publish_all(Table::Bids, ChangeKind::Update, &cancelled);

        Ok((request, cancelled))
    }

    pub async fn complete_request(
        &self,
        shipper_id: Uuid,
        request_id: Uuid,
    ) -> Result<CargoRequest, ServiceError> {
        let request = self.load_request(request_id).await?;
        ensure_owner(shipper_id, &request)?;
        if !request.status.can_transition_to(RequestStatus::Completed) {
            return Err(ServiceError::InvalidRequestStatus(request_id, request.status));
        }

        let request = match self
            .db_client
            .update_request_status(request_id, RequestStatus::InProgress, RequestStatus::Completed)
            .await?
        {
            Some(request) => request,
            None => return Err(self.stale_request(request_id).await),
        };

        tracing::info!("request {} completed", request_id);
        self.realtime.publish(Table::Requests, ChangeKind::Update, &request);

        Ok(request)
    }
}
