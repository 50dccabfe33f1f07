//! In-process row-change fan-out.
//!
//! Every write path publishes a [`RowChange`] after its transaction commits.
//! Consumers subscribe to one table, optionally narrowed with a
//! `column=eq.value` filter, and either poll a [`Subscription`] or hand a
//! callback to [`RealtimeHub::listen`].

use std::{fmt, str::FromStr, sync::Arc};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::{
    sync::broadcast::{self, error::RecvError},
    task::JoinHandle,
};
use uuid::Uuid;

use crate::{
    dtos::FilterUserDto,
    models::usermodel::{User, UserRole},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Profiles,
    Requests,
    Bids,
    Chats,
    Messages,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Profiles => "profiles",
            Table::Requests => "requests",
            Table::Bids => "bids",
            Table::Chats => "chats",
            Table::Messages => "messages",
        }
    }
}

impl FromStr for Table {
    type Err = RealtimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "profiles" | "users" => Ok(Table::Profiles),
            "requests" => Ok(Table::Requests),
            "bids" => Ok(Table::Bids),
            "chats" => Ok(Table::Chats),
            "messages" => Ok(Table::Messages),
            other => Err(RealtimeError::UnknownTable(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone, Serialize)]
pub struct RowChange {
    pub table: Table,
    pub event: ChangeKind,
    pub record: Value,
    pub commit_timestamp: DateTime<Utc>,
}

#[derive(Debug, Error, PartialEq)]
pub enum RealtimeError {
    #[error("Unknown table: {0}")]
    UnknownTable(String),

    #[error("Invalid filter '{0}', expected column=eq.value")]
    InvalidFilter(String),

    #[error("Unsupported filter operator '{0}', only eq is available")]
    UnsupportedOperator(String),
}

/// Equality filter in the `column=eq.value` form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowFilter {
    pub column: String,
    pub value: String,
}

impl RowFilter {
    pub fn eq(column: impl Into<String>, value: impl Into<String>) -> Self {
        RowFilter {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn parse(raw: &str) -> Result<Self, RealtimeError> {
        let (column, rest) = raw
            .split_once('=')
            .ok_or_else(|| RealtimeError::InvalidFilter(raw.to_string()))?;
        let (operator, value) = rest
            .split_once('.')
            .ok_or_else(|| RealtimeError::InvalidFilter(raw.to_string()))?;

        let column_ok = !column.is_empty()
            && column.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
        if !column_ok || value.is_empty() {
            return Err(RealtimeError::InvalidFilter(raw.to_string()));
        }
        if operator != "eq" {
            return Err(RealtimeError::UnsupportedOperator(operator.to_string()));
        }

        // ids are published in lowercase hyphenated form
        match Uuid::parse_str(value) {
            Ok(id) => Ok(RowFilter::eq(column, id.to_string())),
            Err(_) => Ok(RowFilter::eq(column, value)),
        }
    }

    /// The filter value as a UUID when `column` is the filtered column.
    pub fn uuid_for(&self, column: &str) -> Option<Uuid> {
        if self.column == column {
            Uuid::parse_str(&self.value).ok()
        } else {
            None
        }
    }

    pub fn matches(&self, record: &Value) -> bool {
        match record.get(&self.column) {
            Some(Value::String(s)) => *s == self.value,
            Some(Value::Number(n)) => n.to_string() == self.value,
            Some(Value::Bool(b)) => b.to_string() == self.value,
            Some(Value::Null) => self.value == "null",
            _ => false,
        }
    }
}

impl fmt::Display for RowFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}=eq.{}", self.column, self.value)
    }
}

#[derive(Debug, Clone)]
pub struct RealtimeHub {
    sender: broadcast::Sender<Arc<RowChange>>,
}

impl RealtimeHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        RealtimeHub { sender }
    }

    /// Broadcasts a change and returns how many subscribers were live.
    pub fn publish<T: Serialize>(&self, table: Table, event: ChangeKind, record: &T) -> usize {
        let record = match serde_json::to_value(record) {
            Ok(record) => record,
            Err(err) => {
                tracing::error!("could not serialize {} change: {}", table.as_str(), err);
                return 0;
            }
        };

        let change = Arc::new(RowChange {
            table,
            event,
            record,
            commit_timestamp: Utc::now(),
        });

        // no receivers is not an error
        self.sender.send(change).unwrap_or(0)
    }

    /// Profile changes go out in their public shape, never the stored row.
    pub fn publish_profile(&self, event: ChangeKind, user: &User) -> usize {
        self.publish(Table::Profiles, event, &FilterUserDto::filter_user(user))
    }

    pub fn publish_all<T: Serialize>(&self, table: Table, event: ChangeKind, records: &[T]) {
        for record in records {
            self.publish(table, event, record);
        }
    }

    pub fn subscribe(&self, table: Table, filter: Option<RowFilter>) -> Subscription {
        Subscription {
            receiver: self.sender.subscribe(),
            table,
            filter,
        }
    }

    /// Runs `handler` for every matching change until the returned
    /// [`Listener`] is dropped.
    pub fn listen<F>(&self, table: Table, filter: Option<RowFilter>, mut handler: F) -> Listener
    where
        F: FnMut(Arc<RowChange>) + Send + 'static,
    {
        let mut subscription = self.subscribe(table, filter);
        let handle = tokio::spawn(async move {
            while let Some(change) = subscription.next().await {
                handler(change);
            }
        });

        Listener { handle }
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

pub struct Subscription {
    receiver: broadcast::Receiver<Arc<RowChange>>,
    table: Table,
    filter: Option<RowFilter>,
}

impl Subscription {
    /// Waits for the next matching change. `None` once the hub is gone.
    pub async fn next(&mut self) -> Option<Arc<RowChange>> {
        loop {
            match self.receiver.recv().await {
                Ok(change) if self.accepts(&change) => return Some(change),
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        "realtime subscriber on {} lagged, {} changes skipped",
                        self.table.as_str(),
                        skipped
                    );
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    fn accepts(&self, change: &RowChange) -> bool {
        change.table == self.table
            && self
                .filter
                .as_ref()
                .map_or(true, |filter| filter.matches(&change.record))
    }
}

/// Handle of a background listener; dropping it unsubscribes.
pub struct Listener {
    handle: JoinHandle<()>,
}

impl Drop for Listener {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// What must hold before `user` may subscribe to `table` with `filter`.
#[derive(Debug, PartialEq, Eq)]
pub enum AccessCheck {
    Allowed,
    ChatMembership(Uuid),
    RequestOwnership(Uuid),
    Denied(&'static str),
}

pub fn access_check(user: &User, table: Table, filter: Option<&RowFilter>) -> AccessCheck {
    if user.role == UserRole::Admin {
        return AccessCheck::Allowed;
    }

    match table {
        Table::Requests => AccessCheck::Allowed,
        Table::Profiles => match filter.and_then(|f| f.uuid_for("id")) {
            Some(id) if id == user.id => AccessCheck::Allowed,
            _ => AccessCheck::Denied("profiles subscriptions must filter on id=eq.<your id>"),
        },
        Table::Messages => match filter.and_then(|f| f.uuid_for("chat_id")) {
            Some(chat_id) => AccessCheck::ChatMembership(chat_id),
            None => AccessCheck::Denied("messages subscriptions must filter on chat_id"),
        },
        Table::Chats => match filter.and_then(|f| f.uuid_for("id")) {
            Some(chat_id) => AccessCheck::ChatMembership(chat_id),
            None => AccessCheck::Denied("chats subscriptions must filter on id"),
        },
        Table::Bids => {
            if let Some(carrier_id) = filter.and_then(|f| f.uuid_for("carrier_id")) {
                return if carrier_id == user.id {
                    AccessCheck::Allowed
                } else {
                    AccessCheck::Denied("you can only follow your own bids")
                };
            }
            match filter.and_then(|f| f.uuid_for("request_id")) {
                Some(request_id) => AccessCheck::RequestOwnership(request_id),
                None => AccessCheck::Denied("bids subscriptions must filter on request_id or carrier_id"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use tokio::sync::mpsc;

    use super::*;

    fn user(role: UserRole) -> User {
        User {
            id: Uuid::new_v4(),
            email: "ops@transvagon.ru".to_string(),
            password: String::new(),
            full_name: "Pavel Orlov".to_string(),
            role,
            company_name: None,
            phone: None,
            reset_token: None,
            reset_token_expires_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn parses_eq_filters() {
        let filter = RowFilter::parse("chat_id=eq.6f1c").unwrap();
        assert_eq!(filter, RowFilter::eq("chat_id", "6f1c"));
        assert_eq!(filter.to_string(), "chat_id=eq.6f1c");
    }

    #[test]
    fn uuid_filters_match_whatever_case_they_came_in() {
        let chat_id = Uuid::new_v4();
        let raw = format!("chat_id=eq.{}", chat_id.to_string().to_uppercase());
        let filter = RowFilter::parse(&raw).unwrap();

        assert_eq!(filter.uuid_for("chat_id"), Some(chat_id));
        assert!(filter.matches(&json!({ "chat_id": chat_id })));
    }

    #[tokio::test]
    async fn profile_changes_reach_their_owner_without_secrets() {
        let hub = RealtimeHub::new(8);
        let mut owner = user(UserRole::Shipper);
        owner.password = "$argon2id$hash".to_string();

        let filter = RowFilter::parse(&format!("id=eq.{}", owner.id)).unwrap();
        assert_eq!(access_check(&owner, Table::Profiles, Some(&filter)), AccessCheck::Allowed);
        let mut sub = hub.subscribe(Table::Profiles, Some(filter));

        hub.publish_profile(ChangeKind::Update, &user(UserRole::Carrier));
        assert_eq!(hub.publish_profile(ChangeKind::Update, &owner), 1);

        let change = sub.next().await.unwrap();
        assert_eq!(change.record["id"], owner.id.to_string());
        assert_eq!(change.record["full_name"], "Pavel Orlov");
        assert!(change.record.get("password").is_none());
    }

    #[test]
    fn rejects_malformed_filters() {
        assert!(matches!(RowFilter::parse("chat_id"), Err(RealtimeError::InvalidFilter(_))));
        assert!(matches!(RowFilter::parse("chat_id=eq."), Err(RealtimeError::InvalidFilter(_))));
        assert!(matches!(RowFilter::parse("Chat-Id=eq.1"), Err(RealtimeError::InvalidFilter(_))));
        assert_eq!(
            RowFilter::parse("amount=gt.5"),
            Err(RealtimeError::UnsupportedOperator("gt".to_string()))
        );
    }

    #[test]
    fn filter_matches_scalar_columns() {
        let record = json!({ "chat_id": "abc", "amount": 120, "read_at": null, "urgent": true });
        assert!(RowFilter::eq("chat_id", "abc").matches(&record));
        assert!(RowFilter::eq("amount", "120").matches(&record));
        assert!(RowFilter::eq("read_at", "null").matches(&record));
        assert!(RowFilter::eq("urgent", "true").matches(&record));
        assert!(!RowFilter::eq("chat_id", "xyz").matches(&record));
        assert!(!RowFilter::eq("missing", "abc").matches(&record));
    }

    #[test]
    fn table_names_parse() {
        assert_eq!("messages".parse::<Table>().unwrap(), Table::Messages);
        assert_eq!("users".parse::<Table>().unwrap(), Table::Profiles);
        assert!("wagons".parse::<Table>().is_err());
    }

    #[tokio::test]
    async fn subscription_sees_only_its_table_and_filter() {
        let hub = RealtimeHub::new(16);
        let mut sub = hub.subscribe(Table::Messages, Some(RowFilter::eq("chat_id", "a")));

        hub.publish(Table::Bids, ChangeKind::Insert, &json!({ "chat_id": "a" }));
        hub.publish(Table::Messages, ChangeKind::Insert, &json!({ "chat_id": "b", "content": "no" }));
        hub.publish(Table::Messages, ChangeKind::Insert, &json!({ "chat_id": "a", "content": "yes" }));

        let change = sub.next().await.unwrap();
        assert_eq!(change.table, Table::Messages);
        assert_eq!(change.event, ChangeKind::Insert);
        assert_eq!(change.record["content"], "yes");
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_harmless() {
        let hub = RealtimeHub::new(4);
        assert_eq!(hub.publish(Table::Requests, ChangeKind::Update, &json!({ "id": 1 })), 0);
    }

    #[tokio::test]
    async fn lagged_subscriber_keeps_going() {
        let hub = RealtimeHub::new(2);
        let mut sub = hub.subscribe(Table::Requests, None);
        for i in 0..5 {
            hub.publish(Table::Requests, ChangeKind::Insert, &json!({ "n": i }));
        }
        let change = sub.next().await.unwrap();
        assert_eq!(change.record["n"], 3);
    }

    #[tokio::test]
    async fn listener_invokes_handler_and_stops_on_drop() {
        let hub = RealtimeHub::new(16);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let listener = hub.listen(Table::Bids, Some(RowFilter::eq("status", "accepted")), move |change| {
            let _ = tx.send(change.record["id"].clone());
        });

        hub.publish(Table::Bids, ChangeKind::Update, &json!({ "id": 1, "status": "rejected" }));
        hub.publish(Table::Bids, ChangeKind::Update, &json!({ "id": 2, "status": "accepted" }));

        let got = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await.unwrap();
        assert_eq!(got, Some(json!(2)));

        drop(listener);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(hub.receiver_count(), 0);
    }

    #[test]
    fn access_rules() {
        let carrier = user(UserRole::Carrier);
        let chat_id = Uuid::new_v4();
        let request_id = Uuid::new_v4();

        assert_eq!(access_check(&carrier, Table::Requests, None), AccessCheck::Allowed);
        assert_eq!(
            access_check(&carrier, Table::Messages, Some(&RowFilter::eq("chat_id", chat_id.to_string()))),
            AccessCheck::ChatMembership(chat_id)
        );
        assert!(matches!(access_check(&carrier, Table::Messages, None), AccessCheck::Denied(_)));
        assert_eq!(
            access_check(&carrier, Table::Bids, Some(&RowFilter::eq("carrier_id", carrier.id.to_string()))),
            AccessCheck::Allowed
        );
        assert!(matches!(
            access_check(&carrier, Table::Bids, Some(&RowFilter::eq("carrier_id", Uuid::new_v4().to_string()))),
            AccessCheck::Denied(_)
        ));
        assert_eq!(
            access_check(&carrier, Table::Bids, Some(&RowFilter::eq("request_id", request_id.to_string()))),
            AccessCheck::RequestOwnership(request_id)
        );
        assert!(matches!(
            access_check(&carrier, Table::Profiles, Some(&RowFilter::eq("id", Uuid::new_v4().to_string()))),
            AccessCheck::Denied(_)
        ));
        assert_eq!(access_check(&user(UserRole::Admin), Table::Messages, None), AccessCheck::Allowed);
    }
}
