use diesel::pg::PgConnection;
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use vendra_shared::errors::{AppError, AppResult, ErrorCode};
use vendra_shared::schema::user_blocks;

use crate::models::NewUserBlock;

/// Block relation between the caller and one other user, seen from the caller's side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BlockStatus {
    pub i_blocked_them: bool,
    pub they_blocked_me: bool,
    pub any_block: bool,
}

impl BlockStatus {
    pub fn new(i_blocked_them: bool, they_blocked_me: bool) -> Self {
        Self {
            i_blocked_them,
            they_blocked_me,
            any_block: i_blocked_them || they_blocked_me,
        }
    }

    /// The same relation from the other user's side.
    pub fn mirrored(&self) -> Self {
        Self::new(self.they_blocked_me, self.i_blocked_them)
    }

    fn from_edges(me: Uuid, edges: &[(Uuid, Uuid)]) -> Self {
        let i_blocked_them = edges.iter().any(|(blocker, _)| *blocker == me);
        let they_blocked_me = edges.iter().any(|(_, blocked)| *blocked == me);
        Self::new(i_blocked_them, they_blocked_me)
    }
}

pub fn ensure_not_self(me: Uuid, other: Uuid) -> AppResult<()> {
    if me == other {
        return Err(AppError::new(ErrorCode::CannotBlockSelf, "cannot block yourself"));
    }
    Ok(())
}

pub fn block_status(conn: &mut PgConnection, me: Uuid, other: Uuid) -> AppResult<BlockStatus> {
    let edges: Vec<(Uuid, Uuid)> = user_blocks::table
        .filter(
            user_blocks::blocker_id.eq(me).and(user_blocks::blocked_id.eq(other))
                .or(user_blocks::blocker_id.eq(other).and(user_blocks::blocked_id.eq(me))),
        )
        .select((user_blocks::blocker_id, user_blocks::blocked_id))
        .load(conn)?;

    Ok(BlockStatus::from_edges(me, &edges))
}

/// Inserts the block edge. Returns false when it already existed.
pub fn block(conn: &mut PgConnection, blocker: Uuid, blocked: Uuid) -> AppResult<bool> {
    ensure_not_self(blocker, blocked)?;
    let inserted = diesel::insert_into(user_blocks::table)
        .values(&NewUserBlock { blocker_id: blocker, blocked_id: blocked })
        .on_conflict_do_nothing()
        .execute(conn)?;
    Ok(inserted > 0)
}

/// Removes the block edge. Returns false when there was none.
pub fn unblock(conn: &mut PgConnection, blocker: Uuid, blocked: Uuid) -> AppResult<bool> {
    ensure_not_self(blocker, blocked)?;
    let removed = diesel::delete(
        user_blocks::table
            .filter(user_blocks::blocker_id.eq(blocker))
            .filter(user_blocks::blocked_id.eq(blocked)),
    )
    .execute(conn)?;
    Ok(removed > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn any_block_is_the_disjunction() {
        for (mine, theirs) in [(false, false), (true, false), (false, true), (true, true)] {
            let status = BlockStatus::new(mine, theirs);
            assert_eq!(status.any_block, mine || theirs);
        }
    }

    #[test]
    fn edges_are_read_from_the_callers_side() {
        let (me, other) = (Uuid::now_v7(), Uuid::now_v7());
        assert_eq!(BlockStatus::from_edges(me, &[]), BlockStatus::default());
        assert_eq!(BlockStatus::from_edges(me, &[(me, other)]), BlockStatus::new(true, false));
        assert_eq!(BlockStatus::from_edges(me, &[(other, me)]), BlockStatus::new(false, true));
        assert!(BlockStatus::from_edges(me, &[(me, other), (other, me)]).any_block);
    }

    #[test]
    fn mirrored_swaps_directions() {
        let status = BlockStatus::new(true, false).mirrored();
        assert!(!status.i_blocked_them);
        assert!(status.they_blocked_me);
        assert!(status.any_block);
    }

    #[test]
    fn self_block_is_rejected() {
        let me = Uuid::now_v7();
        assert_eq!(ensure_not_self(me, me).unwrap_err().code(), ErrorCode::CannotBlockSelf);
    }
}
