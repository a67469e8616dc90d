//! Like and vote resolution.
//!
//! Stores call these inside their critical section so the read of the
//! existing row and the write of the new one happen atomically.

use crate::domain::types::VoteDirection;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeChange {
    pub liked: bool,
    pub delta: i64,
}

/// A second like by the same user removes the first.
pub fn resolve_like(currently_liked: bool) -> LikeChange {
    if currently_liked {
        LikeChange {
            liked: false,
            delta: -1,
        }
    } else {
        LikeChange {
            liked: true,
            delta: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteChange {
    pub vote: Option<VoteDirection>,
    pub up_delta: i64,
    pub down_delta: i64,
}

/// Same direction retracts, opposite direction moves the vote between buckets.
pub fn resolve_vote(existing: Option<VoteDirection>, cast: VoteDirection) -> VoteChange {
    let bucket = |direction: VoteDirection, delta: i64| match direction {
        VoteDirection::Up => (delta, 0),
        VoteDirection::Down => (0, delta),
    };

    match existing {
        Some(current) if current == cast => {
            let (up_delta, down_delta) = bucket(cast, -1);
            VoteChange {
                vote: None,
                up_delta,
                down_delta,
            }
        }
        Some(current) => {
            let (up_out, down_out) = bucket(current, -1);
            let (up_in, down_in) = bucket(cast, 1);
            VoteChange {
                vote: Some(cast),
                up_delta: up_out + up_in,
                down_delta: down_out + down_in,
            }
        }
        None => {
            let (up_delta, down_delta) = bucket(cast, 1);
            VoteChange {
                vote: Some(cast),
                up_delta,
                down_delta,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn even_number_of_likes_restores_state() {
        let mut liked = false;
        let mut total = 10_i64;
        for _ in 0..4 {
            let change = resolve_like(liked);
            liked = change.liked;
            total += change.delta;
        }
        assert!(!liked);
        assert_eq!(total, 10);

        let change = resolve_like(liked);
        assert_eq!(total + change.delta, 11);
    }

    #[test]
    fn repeated_vote_is_retracted() {
        let first = resolve_vote(None, VoteDirection::Up);
        let second = resolve_vote(first.vote, VoteDirection::Up);
        assert_eq!(second.vote, None);
        assert_eq!(first.up_delta + second.up_delta, 0);
        assert_eq!(first.down_delta + second.down_delta, 0);
    }

    #[test]
    fn flipping_moves_score_by_two() {
        let change = resolve_vote(Some(VoteDirection::Up), VoteDirection::Down);
        assert_eq!(change.vote, Some(VoteDirection::Down));
        assert_eq!(change.up_delta, -1);
        assert_eq!(change.down_delta, 1);
        assert_eq!(change.up_delta - change.down_delta, -2);
    }
}
