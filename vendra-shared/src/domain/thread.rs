//! Two-party message threads. Both messaging and moderation read them.

use chrono::{DateTime, Utc};
use diesel::pg::{Pg, PgConnection};
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use crate::errors::AppResult;
use crate::schema::messages;

#[derive(Debug, Queryable, Selectable, Identifiable, Serialize, Clone, PartialEq)]
#[diesel(table_name = messages)]
pub struct Message {
    pub id: Uuid,
    pub seq: i64,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

/// Orders an unordered pair as `(low, high)`, the key conversations are stored under.
pub fn normalize_pair(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
    if a <= b { (a, b) } else { (b, a) }
}

/// Messages exchanged between `a` and `b`, in either direction, oldest first.
/// With `after_seq` only messages past that cursor match.
pub fn thread_query<'a>(a: Uuid, b: Uuid, after_seq: Option<i64>) -> messages::BoxedQuery<'a, Pg> {
    let mut query = messages::table
        .filter(
            messages::sender_id.eq(a).and(messages::recipient_id.eq(b))
                .or(messages::sender_id.eq(b).and(messages::recipient_id.eq(a))),
        )
        .order((messages::created_at.asc(), messages::seq.asc()))
        .into_boxed();

    if let Some(cursor) = after_seq {
        query = query.filter(messages::seq.gt(cursor));
    }

    query
}

pub fn load_thread(
    conn: &mut PgConnection,
    a: Uuid,
    b: Uuid,
    after_seq: Option<i64>,
) -> AppResult<Vec<Message>> {
    Ok(thread_query(a, b, after_seq)
        .select(Message::as_select())
        .load(conn)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_is_order_independent() {
        let (a, b) = (Uuid::now_v7(), Uuid::now_v7());
        assert_eq!(normalize_pair(a, b), normalize_pair(b, a));
        let (low, high) = normalize_pair(b, a);
        assert!(low < high);
    }

    fn sql_and_binds(a: Uuid, b: Uuid, after_seq: Option<i64>) -> (String, String) {
        let rendered = diesel::debug_query::<Pg, _>(&thread_query(a, b, after_seq)).to_string();
        let (sql, binds) = rendered.split_once("-- binds:").unwrap();
        (sql.trim().to_string(), binds.trim().to_string())
    }

    #[test]
    fn thread_query_matches_both_directions() {
        let (a, b) = (Uuid::now_v7(), Uuid::now_v7());
        let (sql, binds) = sql_and_binds(a, b, None);

        assert!(sql.contains(r#""messages"."sender_id" = $1"#), "{sql}");
        assert!(sql.contains(r#""messages"."recipient_id" = $2"#), "{sql}");
        assert!(sql.contains(r#""messages"."sender_id" = $3"#), "{sql}");
        assert!(sql.contains(r#""messages"."recipient_id" = $4"#), "{sql}");
        assert!(sql.contains(" OR "), "{sql}");
        assert_eq!(binds, format!("[{a}, {b}, {b}, {a}]"));

        // Swapping the participants yields the same statement with mirrored binds.
        let (swapped_sql, swapped_binds) = sql_and_binds(b, a, None);
        assert_eq!(swapped_sql, sql);
        assert_eq!(swapped_binds, format!("[{b}, {a}, {a}, {b}]"));
    }

    #[test]
    fn thread_query_is_ascending_with_optional_cursor() {
        let (a, b) = (Uuid::now_v7(), Uuid::now_v7());
        let (sql, _) = sql_and_binds(a, b, None);
        assert!(sql.contains(r#"ORDER BY "messages"."created_at" ASC, "messages"."seq" ASC"#), "{sql}");
        assert!(!sql.contains(r#""messages"."seq" >"#), "{sql}");

        let (sql, binds) = sql_and_binds(a, b, Some(41));
        assert!(sql.contains(r#""messages"."seq" > $5"#), "{sql}");
        assert!(binds.ends_with("41]"), "{binds}");
    }
}
