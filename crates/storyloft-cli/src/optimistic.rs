//! Optimistic updates with rollback.

use std::future::Future;

use storyloft_api_types::{LikeResponse, VoteDirection, VoteResponse};

/// A locally displayed value that can be updated ahead of the server.
///
/// [`Optimistic::run`] borrows the value mutably for the whole round trip, so a
/// second interaction on the same value cannot start while one is in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Optimistic<T> {
    value: T,
}

impl<T: Clone> Optimistic<T> {
    pub fn new(value: T) -> Self {
        Self { value }
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn into_inner(self) -> T {
        self.value
    }

    /// Shows `tentative` while `call` runs, then adopts the authoritative state
    /// derived by `reconcile`, or restores the prior value if the call fails.
    pub async fn run<R, E, Fut>(
        &mut self,
        tentative: T,
        call: Fut,
        reconcile: impl FnOnce(&T, &R) -> T,
    ) -> Result<R, E>
    where
        Fut: Future<Output = Result<R, E>>,
    {
        let prior = std::mem::replace(&mut self.value, tentative);
        match call.await {
            Ok(response) => {
                self.value = reconcile(&prior, &response);
                Ok(response)
            }
            Err(err) => {
                self.value = prior;
                Err(err)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LikeState {
    pub liked: bool,
    pub total_likes: i64,
}

impl LikeState {
    /// The state a successful toggle is expected to produce.
    #[must_use]
    pub fn toggled(self) -> Self {
        if self.liked {
            Self {
                liked: false,
                total_likes: (self.total_likes - 1).max(0),
            }
        } else {
            Self {
                liked: true,
                total_likes: self.total_likes + 1,
            }
        }
    }
}

impl From<LikeResponse> for LikeState {
    fn from(response: LikeResponse) -> Self {
        Self {
            liked: response.liked,
            total_likes: response.total_likes,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VoteState {
    pub upvotes: i64,
    pub downvotes: i64,
    pub user_vote: Option<VoteDirection>,
}

impl VoteState {
    #[must_use]
    pub fn score(self) -> i64 {
        self.upvotes - self.downvotes
    }

    /// Applies a vote the way the server does: repeating a direction retracts
    /// it, the opposite direction moves the vote between buckets.
    #[must_use]
    pub fn cast(self, direction: VoteDirection) -> Self {
        let mut next = self;
        match self.user_vote {
            Some(existing) if existing == direction => {
                next.bump(direction, -1);
                next.user_vote = None;
            }
            Some(existing) => {
                next.bump(existing, -1);
                next.bump(direction, 1);
                next.user_vote = Some(direction);
            }
            None => {
                next.bump(direction, 1);
                next.user_vote = Some(direction);
            }
        }
        next
    }

    fn bump(&mut self, direction: VoteDirection, delta: i64) {
        match direction {
            VoteDirection::Up => self.upvotes = (self.upvotes + delta).max(0),
            VoteDirection::Down => self.downvotes = (self.downvotes + delta).max(0),
        }
    }
}

impl From<VoteResponse> for VoteState {
    fn from(response: VoteResponse) -> Self {
        Self {
            upvotes: response.upvotes,
            downvotes: response.downvotes,
            user_vote: response.user_vote,
        }
    }
}
