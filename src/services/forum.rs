use std::collections::HashSet;
use std::sync::Arc;

use tracing::info;

use crate::client::MoodleApi;
use crate::error::AppError;
use crate::models::{Ack, Post, ReplyRequest, Session};
use crate::services::html::strip_html;

/// A post and the replies underneath it.
#[derive(Debug, Clone, PartialEq)]
pub struct ThreadNode {
    pub post: Post,
    pub replies: Vec<ThreadNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Thread {
    pub root: ThreadNode,
    /// Posts that could not be hung under the root: their parent is not in
    /// the listing (deleted or hidden), or they sit on a parent cycle.
    pub orphans: Vec<Post>,
}

impl ThreadNode {
    /// `placed` holds listing indices already in the tree, so parent cycles
    /// and repeated ids end the recursion instead of looping.
    fn build(index: usize, posts: &[Post], placed: &mut HashSet<usize>) -> Self {
        placed.insert(index);
        let post = posts[index].clone();

        let mut children: Vec<usize> = (0..posts.len())
            .filter(|&i| posts[i].parent_id == Some(post.id) && posts[i].id != post.id)
            .filter(|i| !placed.contains(i))
            .collect();
        children.sort_by_key(|&i| (posts[i].created, posts[i].id));

        let mut replies = Vec::with_capacity(children.len());
        for child in children {
            // a deeper reply may already have claimed it
            if placed.contains(&child) {
                continue;
            }
            replies.push(ThreadNode::build(child, posts, placed));
        }
        ThreadNode { post, replies }
    }

    /// This post plus every reply below it.
    pub fn count(&self) -> usize {
        1 + self.replies.iter().map(ThreadNode::count).sum::<usize>()
    }

    /// Depth-first walk yielding `(depth, post)`.
    pub fn walk(&self) -> Vec<(usize, &Post)> {
        let mut out = Vec::new();
        self.walk_into(0, &mut out);
        out
    }

    fn walk_into<'a>(&'a self, depth: usize, out: &mut Vec<(usize, &'a Post)>) {
        out.push((depth, &self.post));
        for reply in &self.replies {
            reply.walk_into(depth + 1, out);
        }
    }
}

impl Thread {
    /// The root is the post without a parent, or the oldest post if the
    /// listing has none.
    pub fn from_posts(posts: Vec<Post>) -> Option<Thread> {
        let root = posts
            .iter()
            .position(|p| p.parent_id.is_none())
            .or_else(|| {
                (0..posts.len()).min_by_key(|&i| (posts[i].created, posts[i].id))
            })?;

        let mut placed = HashSet::new();
        let node = ThreadNode::build(root, &posts, &mut placed);
        let orphans = posts
            .into_iter()
            .enumerate()
            .filter(|(i, _)| !placed.contains(i))
            .map(|(_, p)| p)
            .collect();

        Some(Thread { root: node, orphans })
    }
}

/// The most recent post in the listing; new replies hang off it.
pub fn reply_target(posts: &[Post]) -> Option<&Post> {
    posts.iter().max_by_key(|p| (p.created, p.id))
}

pub fn plan_reply(posts: &[Post], discussion_subject: &str, message: &str) -> Result<ReplyRequest, AppError> {
    if message.trim().is_empty() {
        return Err(AppError::Validation("write a message".to_string()));
    }
    let target = reply_target(posts)
        .ok_or_else(|| AppError::Validation("there are no posts to reply to".to_string()))?;

    let subject = strip_html(discussion_subject);
    let subject = if subject.starts_with("Re: ") {
        subject
    } else {
        format!("Re: {}", subject)
    };

    Ok(ReplyRequest {
        postid: target.id,
        subject,
        message: format!("<p>{}</p>", message.trim()),
    })
}

pub struct ForumService {
    api: Arc<dyn MoodleApi>,
}

impl ForumService {
    pub fn new(api: Arc<dyn MoodleApi>) -> Self {
        Self { api }
    }

    pub async fn thread(&self, session: &Session, discussion_id: i64) -> Result<Option<Thread>, AppError> {
        if discussion_id <= 0 {
            return Err(AppError::InvalidInput(format!(
                "discussion id must be positive, got {}",
                discussion_id
            )));
        }
        let posts = self.api.fetch_posts(session, discussion_id).await?;
        Ok(Thread::from_posts(posts))
    }

    /// Reply to the latest post of a discussion. Posts are fetched fresh so
    /// the reply never targets a stale listing.
    pub async fn reply(
        &self,
        session: &Session,
        discussion_id: i64,
        discussion_subject: &str,
        message: &str,
    ) -> Result<Ack, AppError> {
        if discussion_id <= 0 {
            return Err(AppError::InvalidInput(format!(
                "discussion id must be positive, got {}",
                discussion_id
            )));
        }
        if message.trim().is_empty() {
            return Err(AppError::Validation("write a message".to_string()));
        }

        let posts = self.api.fetch_posts(session, discussion_id).await?;
        let request = plan_reply(&posts, discussion_subject, message)?;
        let ack = self.api.reply(session, &request).await?;
        info!("replied to post {} in discussion {}", request.postid, discussion_id);
        Ok(ack)
    }
}
