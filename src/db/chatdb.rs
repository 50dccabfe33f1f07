// db/chatdb.rs
use async_trait::async_trait;
use sqlx::Error;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::chatmodel::*;

#[async_trait]
pub trait ChatExt {
    async fn get_user_chats(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<ChatSummary>, Error>;

    async fn get_chat_by_id(
        &self,
        chat_id: Uuid,
    ) -> Result<Option<Chat>, Error>;

    async fn get_chat_participants(
        &self,
        chat_id: Uuid,
    ) -> Result<Vec<ChatParticipant>, Error>;

    async fn is_chat_participant(
        &self,
        chat_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, Error>;

    async fn send_message(
        &self,
        chat_id: Uuid,
        sender_id: Uuid,
        content: &str,
    ) -> Result<Message, Error>;

    async fn get_chat_messages(
        &self,
        chat_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Message>, Error>;

    /// Moves the reader's `last_read_at` to now and stamps `read_at` on the
    /// other party's unread messages. Returns the stamped messages.
    async fn mark_messages_as_read(
        &self,
        chat_id: Uuid,
        user_id: Uuid,
    ) -> Result<Vec<Message>, Error>;

    async fn get_unread_count(
        &self,
        user_id: Uuid,
    ) -> Result<i64, Error>;
}

#[async_trait]
impl ChatExt for DBClient {
    async fn get_user_chats(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<ChatSummary>, Error> {
        sqlx::query_as::<_, ChatSummary>(
            r#"
            SELECT c.id, c.request_id, c.bid_id, c.created_at, c.updated_at,
                   r.origin, r.destination, r.title AS request_title,
                   b.amount AS bid_amount,
                   lm.content AS last_message,
                   lm.created_at AS last_message_at,
                   (
                       SELECT COUNT(*)
                       FROM messages m
                       WHERE m.chat_id = c.id
                         AND m.sender_id <> $1
                         AND m.created_at > cp.last_read_at
                   ) AS unread_count
            FROM chat_participants cp
            JOIN chats c ON c.id = cp.chat_id
            JOIN requests r ON r.id = c.request_id
            LEFT JOIN bids b ON b.id = c.bid_id
            LEFT JOIN LATERAL (
                SELECT content, created_at
                FROM messages
                WHERE chat_id = c.id
                ORDER BY created_at DESC
                LIMIT 1
            ) lm ON TRUE
            WHERE cp.user_id = $1
            ORDER BY COALESCE(lm.created_at, c.updated_at) DESC
            "#
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_chat_by_id(
        &self,
        chat_id: Uuid,
    ) -> Result<Option<Chat>, Error> {
        sqlx::query_as::<_, Chat>(
            r#"
            SELECT id, request_id, bid_id, created_at, updated_at
            FROM chats
            WHERE id = $1
            "#
        )
        .bind(chat_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_chat_participants(
        &self,
        chat_id: Uuid,
    ) -> Result<Vec<ChatParticipant>, Error> {
        sqlx::query_as::<_, ChatParticipant>(
            r#"
            SELECT cp.chat_id, cp.user_id, p.full_name, cp.last_read_at
            FROM chat_participants cp
            JOIN profiles p ON p.id = cp.user_id
            WHERE cp.chat_id = $1
            ORDER BY p.full_name
            "#
        )
        .bind(chat_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn is_chat_participant(
        &self,
        chat_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, Error> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM chat_participants WHERE chat_id = $1 AND user_id = $2
            )
            "#
        )
        .bind(chat_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn send_message(
        &self,
        chat_id: Uuid,
        sender_id: Uuid,
        content: &str,
    ) -> Result<Message, Error> {
        let mut tx = self.pool.begin().await?;

        let message = sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO messages (chat_id, sender_id, content)
            VALUES ($1, $2, $3)
            RETURNING id, chat_id, sender_id, content, read_at, created_at
            "#
        )
        .bind(chat_id)
        .bind(sender_id)
        .bind(content)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE chats SET updated_at = NOW() WHERE id = $1")
            .bind(chat_id)
            .execute(&mut *tx)
            .await?;

        // the sender has read everything up to their own message
        sqlx::query(
            "UPDATE chat_participants SET last_read_at = $3 WHERE chat_id = $1 AND user_id = $2"
        )
        .bind(chat_id)
        .bind(sender_id)
        .bind(message.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(message)
    }

    async fn get_chat_messages(
        &self,
        chat_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Message>, Error> {
        sqlx::query_as::<_, Message>(
            r#"
            SELECT id, chat_id, sender_id, content, read_at, created_at
            FROM messages
            WHERE chat_id = $1
            ORDER BY created_at ASC
            LIMIT $2 OFFSET $3
            "#
        )
        .bind(chat_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    async fn mark_messages_as_read(
        &self,
        chat_id: Uuid,
        user_id: Uuid,
    ) -> Result<Vec<Message>, Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "UPDATE chat_participants SET last_read_at = NOW() WHERE chat_id = $1 AND user_id = $2"
        )
        .bind(chat_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        let stamped = sqlx::query_as::<_, Message>(
            r#"
            UPDATE messages
            SET read_at = NOW()
            WHERE chat_id = $1 AND sender_id <> $2 AND read_at IS NULL
            RETURNING id, chat_id, sender_id, content, read_at, created_at
            "#
        )
        .bind(chat_id)
        .bind(user_id)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(stamped)
    }

    async fn get_unread_count(
        &self,
        user_id: Uuid,
    ) -> Result<i64, Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM messages m
            JOIN chat_participants cp ON cp.chat_id = m.chat_id AND cp.user_id = $1
            WHERE m.sender_id <> $1
              AND m.created_at > cp.last_read_at
            "#
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
    }
}
