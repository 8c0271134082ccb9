//! # Like Tracker
//!
//! Process-local record of which users liked which post. Nothing here is
//! persisted: restarting the server forgets every like, and two server
//! processes do not see each other's likes.

use dashmap::DashMap;

use crate::models::PostId;

#[derive(Debug, Default)]
pub struct LikeTracker {
    likes: DashMap<PostId, Vec<String>>,
}

impl LikeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a like. Returns `false` if this user already liked the post.
    pub fn like(&self, post_id: PostId, username: &str) -> bool {
        // The entry guard holds the shard lock across the check and the push.
        let mut users = self.likes.entry(post_id).or_default();
        if users.iter().any(|u| u == username) {
            return false;
        }
        users.push(username.to_string());
        true
    }

    /// Usernames in the order they liked the post.
    pub fn likes_for(&self, post_id: PostId) -> Vec<String> {
        self.likes
            .get(&post_id)
            .map(|users| users.value().clone())
            .unwrap_or_default()
    }

    pub fn count(&self, post_id: PostId) -> usize {
        self.likes.get(&post_id).map(|users| users.len()).unwrap_or(0)
    }

    pub fn has_liked(&self, post_id: PostId, username: &str) -> bool {
        self.likes
            .get(&post_id)
            .map(|users| users.iter().any(|u| u == username))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn like_is_idempotent_per_user() {
        let tracker = LikeTracker::new();
        assert!(tracker.like(1, "alice"));
        assert!(!tracker.like(1, "alice"));
        assert_eq!(tracker.count(1), 1);
        assert_eq!(tracker.likes_for(1), vec!["alice".to_string()]);
    }

    #[test]
    fn likes_keep_insertion_order() {
        let tracker = LikeTracker::new();
        tracker.like(7, "carol");
        tracker.like(7, "alice");
        tracker.like(7, "bob");
        tracker.like(7, "alice");
        assert_eq!(tracker.likes_for(7), vec!["carol", "alice", "bob"]);
        assert!(tracker.has_liked(7, "bob"));
        assert!(!tracker.has_liked(8, "bob"));
    }

    #[test]
    fn unknown_post_has_no_likes() {
        let tracker = LikeTracker::new();
        assert_eq!(tracker.count(42), 0);
        assert!(tracker.likes_for(42).is_empty());
        assert!(!tracker.has_liked(42, "alice"));
    }

    #[test]
    fn concurrent_likes_are_not_lost_or_duplicated() {
        let tracker = Arc::new(LikeTracker::new());
        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let tracker = Arc::clone(&tracker);
                thread::spawn(move || {
                    for round in 0..50 {
                        // Every worker races on the same 10 usernames.
                        tracker.like(1, &format!("user{}", (worker + round) % 10));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(tracker.count(1), 10);
    }
}
