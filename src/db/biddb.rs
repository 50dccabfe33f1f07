// db/biddb.rs
use async_trait::async_trait;
use sqlx::types::BigDecimal;
use uuid::Uuid;

use super::db::DBClient;
use crate::{
    models::bidmodel::{Bid, BidStatus, BidWithCarrier, BidWithRequest},
    utils::money::to_money,
};

pub(crate) const BID_COLUMNS: &str = r#"
    id, request_id, carrier_id, amount, comment, status, created_at, updated_at
"#;

#[async_trait]
pub trait BidExt {
    /// Inserts a pending bid, but only while the request is open. The request
    /// row is share-locked first, so a concurrent accept or cancel either
    /// commits before the check or waits for the insert. Returns `None` when
    /// the request is missing or no longer takes bids.
    async fn create_bid(
        &self,
        request_id: Uuid,
        carrier_id: Uuid,
        amount: BigDecimal,
        comment: Option<String>,
    ) -> Result<Option<Bid>, sqlx::Error>;

    async fn get_bid(
        &self,
        bid_id: Uuid,
    ) -> Result<Option<Bid>, sqlx::Error>;

    /// Bids on a request, lowest amount first. `carrier_id` narrows the list
    /// to one bidder.
    async fn get_bids_for_request(
        &self,
        request_id: Uuid,
        carrier_id: Option<Uuid>,
    ) -> Result<Vec<BidWithCarrier>, sqlx::Error>;

    async fn get_bids_by_carrier(
        &self,
        carrier_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<BidWithRequest>, sqlx::Error>;

    async fn get_bids_for_shipper(
        &self,
        shipper_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<BidWithCarrier>, sqlx::Error>;

    /// Edits a pending bid on an open request. Returns `None` otherwise.
    async fn update_bid(
        &self,
        bid_id: Uuid,
        amount: Option<BigDecimal>,
        comment: Option<String>,
    ) -> Result<Option<Bid>, sqlx::Error>;

    async fn update_bid_status(
        &self,
        bid_id: Uuid,
        from: BidStatus,
        to: BidStatus,
    ) -> Result<Option<Bid>, sqlx::Error>;
}

#[async_trait]
impl BidExt for DBClient {
    async fn create_bid(
        &self,
        request_id: Uuid,
        carrier_id: Uuid,
        amount: BigDecimal,
        comment: Option<String>,
    ) -> Result<Option<Bid>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        // waits out an accept or cancel holding the request FOR UPDATE
        let open = sqlx::query_scalar::<_, bool>(
            "SELECT status = 'open' FROM requests WHERE id = $1 FOR SHARE",
        )
        .bind(request_id)
        .fetch_optional(&mut *tx)
        .await?
        .unwrap_or(false);

        if !open {
            return Ok(None);
        }

        let bid = sqlx::query_as::<_, Bid>(&format!(
            r#"
            INSERT INTO bids (request_id, carrier_id, amount, comment)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            BID_COLUMNS
        ))
        .bind(request_id)
        .bind(carrier_id)
        .bind(to_money(&amount))
        .bind(comment)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(bid))
    }

    async fn get_bid(
        &self,
        bid_id: Uuid,
    ) -> Result<Option<Bid>, sqlx::Error> {
        sqlx::query_as::<_, Bid>(&format!("SELECT {} FROM bids WHERE id = $1", BID_COLUMNS))
            .bind(bid_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_bids_for_request(
        &self,
        request_id: Uuid,
        carrier_id: Option<Uuid>,
    ) -> Result<Vec<BidWithCarrier>, sqlx::Error> {
        sqlx::query_as::<_, BidWithCarrier>(
            r#"
            SELECT b.id, b.request_id, b.carrier_id, b.amount, b.comment, b.status,
                   b.created_at, b.updated_at,
                   p.full_name AS carrier_name, p.company_name AS carrier_company
            FROM bids b
            JOIN profiles p ON p.id = b.carrier_id
            WHERE b.request_id = $1
              AND ($2::uuid IS NULL OR b.carrier_id = $2)
            ORDER BY (b.status = 'accepted') DESC, (b.status = 'pending') DESC, b.amount ASC, b.created_at ASC
            "#,
        )
        .bind(request_id)
        .bind(carrier_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_bids_by_carrier(
        &self,
        carrier_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<BidWithRequest>, sqlx::Error> {
        sqlx::query_as::<_, BidWithRequest>(
            r#"
            SELECT b.id, b.request_id, b.carrier_id, b.amount, b.comment, b.status,
                   b.created_at, b.updated_at,
                   r.origin AS request_origin,
                   r.destination AS request_destination,
                   r.wagon_type AS request_wagon_type,
                   r.loading_date AS request_loading_date,
                   r.status AS request_status,
                   c.id AS chat_id
            FROM bids b
            JOIN requests r ON r.id = b.request_id
            LEFT JOIN chats c ON c.bid_id = b.id
            WHERE b.carrier_id = $1
            ORDER BY b.created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(carrier_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_bids_for_shipper(
        &self,
        shipper_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<BidWithCarrier>, sqlx::Error> {
        sqlx::query_as::<_, BidWithCarrier>(
            r#"
            SELECT b.id, b.request_id, b.carrier_id, b.amount, b.comment, b.status,
                   b.created_at, b.updated_at,
                   p.full_name AS carrier_name, p.company_name AS carrier_company
            FROM bids b
            JOIN requests r ON r.id = b.request_id
            JOIN profiles p ON p.id = b.carrier_id
            WHERE r.shipper_id = $1
            ORDER BY b.created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(shipper_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    async fn update_bid(
        &self,
        bid_id: Uuid,
        amount: Option<BigDecimal>,
        comment: Option<String>,
    ) -> Result<Option<Bid>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let open = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT r.status = 'open'
            FROM requests r
            JOIN bids b ON b.request_id = r.id
            WHERE b.id = $1
            FOR SHARE OF r
            "#,
        )
        .bind(bid_id)
        .fetch_optional(&mut *tx)
        .await?
        .unwrap_or(false);

        if !open {
            return Ok(None);
        }

        let bid = sqlx::query_as::<_, Bid>(&format!(
            r#"
            UPDATE bids
            SET amount = COALESCE($2, amount),
                comment = COALESCE($3, comment),
                updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            RETURNING {}
            "#,
            BID_COLUMNS
        ))
        .bind(bid_id)
        .bind(amount.as_ref().map(to_money))
        .bind(comment)
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(bid)
    }

    async fn update_bid_status(
        &self,
        bid_id: Uuid,
        from: BidStatus,
        to: BidStatus,
    ) -> Result<Option<Bid>, sqlx::Error> {
        sqlx::query_as::<_, Bid>(&format!(
            r#"
            UPDATE bids
            SET status = $3, updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING {}
            "#,
            BID_COLUMNS
        ))
        .bind(bid_id)
        .bind(from)
        .bind(to)
        .fetch_optional(&self.pool)
        .await
    }
}
