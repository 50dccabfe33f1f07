// db/requestdb.rs
use async_trait::async_trait;
use uuid::Uuid;

use super::db::DBClient;
use crate::{
    dtos::requestdtos::{CreateRequestDto, UpdateRequestDto},
    models::requestmodel::{CargoRequest, OpenRequestFilter, RequestStatus, RequestWithBidStats},
};

pub(crate) const REQUEST_COLUMNS: &str = r#"
    id, shipper_id, title, origin, destination, cargo_description, wagon_type,
    wagon_count, loading_date, target_price, status, accepted_carrier_id,
    created_at, updated_at
"#;

#[async_trait]
pub trait RequestExt {
    async fn create_request(
        &self,
        shipper_id: Uuid,
        body: &CreateRequestDto,
    ) -> Result<CargoRequest, sqlx::Error>;

    async fn get_request(
        &self,
        request_id: Uuid,
    ) -> Result<Option<CargoRequest>, sqlx::Error>;

    async fn get_requests_by_shipper(
        &self,
        shipper_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<RequestWithBidStats>, sqlx::Error>;

    async fn count_requests_by_shipper(
        &self,
        shipper_id: Uuid,
    ) -> Result<i64, sqlx::Error>;

    async fn get_open_requests(
        &self,
        filter: &OpenRequestFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<CargoRequest>, sqlx::Error>;

    /// Applies a partial edit. Returns `None` when the request is no longer open.
    async fn update_request(
        &self,
        request_id: Uuid,
        body: &UpdateRequestDto,
    ) -> Result<Option<CargoRequest>, sqlx::Error>;

    /// Moves the request from `from` to `to`. Returns `None` when the row
    /// was not in `from` any more.
    async fn update_request_status(
        &self,
        request_id: Uuid,
        from: RequestStatus,
        to: RequestStatus,
    ) -> Result<Option<CargoRequest>, sqlx::Error>;
}

#[async_trait]
impl RequestExt for DBClient {
    async fn create_request(
        &self,
        shipper_id: Uuid,
        body: &CreateRequestDto,
    ) -> Result<CargoRequest, sqlx::Error> {
        sqlx::query_as::<_, CargoRequest>(&format!(
            r#"
            INSERT INTO requests (
                shipper_id, title, origin, destination, cargo_description,
                wagon_type, wagon_count, loading_date, target_price
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            REQUEST_COLUMNS
        ))
        .bind(shipper_id)
        .bind(body.title.as_deref().map(str::trim))
        .bind(body.origin.trim())
        .bind(body.destination.trim())
        .bind(body.cargo_description.trim())
        .bind(body.wagon_type)
        .bind(body.wagon_count)
        .bind(body.loading_date)
        .bind(&body.target_price)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_request(
        &self,
        request_id: Uuid,
    ) -> Result<Option<CargoRequest>, sqlx::Error> {
        sqlx::query_as::<_, CargoRequest>(&format!(
            "SELECT {} FROM requests WHERE id = $1",
            REQUEST_COLUMNS
        ))
        .bind(request_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_requests_by_shipper(
        &self,
        shipper_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<RequestWithBidStats>, sqlx::Error> {
        sqlx::query_as::<_, RequestWithBidStats>(
            r#"
            SELECT r.id, r.shipper_id, r.title, r.origin, r.destination, r.cargo_description,
                   r.wagon_type, r.wagon_count, r.loading_date, r.target_price, r.status,
                   r.accepted_carrier_id, r.created_at, r.updated_at,
                   COUNT(b.id) AS bid_count,
                   COUNT(b.id) FILTER (WHERE b.status = 'pending') AS pending_bid_count,
                   MIN(b.amount) FILTER (WHERE b.status = 'pending') AS lowest_pending_amount
            FROM requests r
            LEFT JOIN bids b ON b.request_id = r.id
            WHERE r.shipper_id = $1
            GROUP BY r.id
            ORDER BY r.created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(shipper_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    async fn count_requests_by_shipper(
        &self,
        shipper_id: Uuid,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM requests WHERE shipper_id = $1")
            .bind(shipper_id)
            .fetch_one(&self.pool)
            .await
    }

    async fn get_open_requests(
        &self,
        filter: &OpenRequestFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<CargoRequest>, sqlx::Error> {
        sqlx::query_as::<_, CargoRequest>(&format!(
            r#"
            SELECT {}
            FROM requests
            WHERE status = 'open'
              AND ($1::wagon_type IS NULL OR wagon_type = $1)
              AND ($2::date IS NULL OR loading_date >= $2)
              AND ($3::date IS NULL OR loading_date <= $3)
            ORDER BY created_at DESC
            LIMIT $4 OFFSET $5
            "#,
            REQUEST_COLUMNS
        ))
        .bind(filter.wagon_type)
        .bind(filter.date_from)
        .bind(filter.date_to)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    async fn update_request(
        &self,
        request_id: Uuid,
        body: &UpdateRequestDto,
    ) -> Result<Option<CargoRequest>, sqlx::Error> {
        sqlx::query_as::<_, CargoRequest>(&format!(
            r#"
            UPDATE requests
            SET title = COALESCE($2, title),
                origin = COALESCE($3, origin),
                destination = COALESCE($4, destination),
                cargo_description = COALESCE($5, cargo_description),
                wagon_type = COALESCE($6, wagon_type),
                wagon_count = COALESCE($7, wagon_count),
                loading_date = COALESCE($8, loading_date),
                target_price = COALESCE($9, target_price),
                updated_at = NOW()
            WHERE id = $1 AND status = 'open'
            RETURNING {}
            "#,
            REQUEST_COLUMNS
        ))
        .bind(request_id)
        .bind(body.title.as_deref().map(str::trim))
        .bind(body.origin.as_deref().map(str::trim))
        .bind(body.destination.as_deref().map(str::trim))
        .bind(body.cargo_description.as_deref().map(str::trim))
        .bind(body.wagon_type)
        .bind(body.wagon_count)
        .bind(body.loading_date)
        .bind(&body.target_price)
        .fetch_optional(&self.pool)
        .await
    }

    async fn update_request_status(
        &self,
        request_id: Uuid,
        from: RequestStatus,
        to: RequestStatus,
    ) -> Result<Option<CargoRequest>, sqlx::Error> {
        sqlx::query_as::<_, CargoRequest>(&format!(
            r#"
            UPDATE requests
            SET status = $3, updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING {}
            "#,
            REQUEST_COLUMNS
        ))
        .bind(request_id)
        .bind(from)
        .bind(to)
        .fetch_optional(&self.pool)
        .await
    }
}
