//! Ownership-based authorization for posts.

use uuid::Uuid;

use super::post::Post;

/// Actions a user may attempt on an existing post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostAction {
    View,
    Update,
    Delete,
}

/// Decide whether `actor` (`None` for anonymous visitors) may perform `action` on `post`.
pub fn can(action: PostAction, post: &Post, actor: Option<Uuid>) -> bool {
    match action {
        PostAction::View => true,
        PostAction::Update | PostAction::Delete => actor.is_some_and(|id| post.is_owned_by(id)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post_by(owner: Uuid) -> Post {
        Post::new(owner, "Title".into(), "Body".into())
    }

    #[test]
    fn test_anyone_can_view() {
        let post = post_by(Uuid::new_v4());
        assert!(can(PostAction::View, &post, None));
        assert!(can(PostAction::View, &post, Some(Uuid::new_v4())));
    }

    #[test]
    fn test_owner_can_mutate() {
        let owner = Uuid::new_v4();
        let post = post_by(owner);
        assert!(can(PostAction::Update, &post, Some(owner)));
        assert!(can(PostAction::Delete, &post, Some(owner)));
    }

    #[test]
    fn test_others_cannot_mutate() {
        let post = post_by(Uuid::new_v4());
        let stranger = Some(Uuid::new_v4());
        assert!(!can(PostAction::Update, &post, stranger));
        assert!(!can(PostAction::Delete, &post, stranger));
        assert!(!can(PostAction::Update, &post, None));
        assert!(!can(PostAction::Delete, &post, None));
    }
}
