//! Builders shared by the unit tests of this crate.

use std::sync::Arc;

use pushgate_core::{
    BranchNameKey, Commit, CommitReceivedEvent, IdentifiedUser, ObjectId, PersonIdent,
    ProjectName, ReceiveCommand,
};
use pushgate_state::fakes::MemoryDiffOperations;

pub const COMMIT: &str = "1111111111111111111111111111111111111111";
pub const PARENT: &str = "2222222222222222222222222222222222222222";
pub const OTHER_PARENT: &str = "3333333333333333333333333333333333333333";

pub fn oid(hex: &str) -> ObjectId {
    ObjectId::parse(hex).unwrap()
}

pub fn commit(message: &str) -> Commit {
    Commit {
        id: oid(COMMIT),
        parents: vec![oid(PARENT)],
        author: PersonIdent::new("Author", "author@example.com"),
        committer: PersonIdent::new("Author", "author@example.com"),
        message: message.to_string(),
    }
}

pub fn merge_commit(message: &str) -> Commit {
    let mut c = commit(message);
    c.parents.push(oid(OTHER_PARENT));
    c
}

pub fn uploader() -> IdentifiedUser {
    IdentifiedUser::new(1000)
        .with_user_name("jdoe")
        .with_email("author@example.com")
}

pub struct EventBuilder {
    ref_name: String,
    branch: String,
    project: String,
    old_id: ObjectId,
    commit: Commit,
    user: IdentifiedUser,
    diff: Arc<MemoryDiffOperations>,
}

impl EventBuilder {
    pub fn new(commit: Commit) -> Self {
        Self {
            ref_name: "refs/for/main".to_string(),
            branch: "refs/heads/main".to_string(),
            project: "project".to_string(),
            old_id: ObjectId::zero(),
            commit,
            user: uploader(),
            diff: Arc::new(MemoryDiffOperations::new()),
        }
    }

    pub fn ref_name(mut self, ref_name: &str) -> Self {
        self.ref_name = ref_name.to_string();
        self
    }

    pub fn branch(mut self, branch: &str) -> Self {
        self.branch = branch.to_string();
        self
    }

    pub fn project(mut self, project: &str) -> Self {
        self.project = project.to_string();
        self
    }

    pub fn old_id(mut self, old_id: ObjectId) -> Self {
        self.old_id = old_id;
        self
    }

    pub fn user(mut self, user: IdentifiedUser) -> Self {
        self.user = user;
        self
    }

    pub fn diff(mut self, diff: Arc<MemoryDiffOperations>) -> Self {
        self.diff = diff;
        self
    }

    pub fn build(self) -> CommitReceivedEvent {
        let command = ReceiveCommand::new(self.ref_name, self.old_id, self.commit.id.clone());
        CommitReceivedEvent::new(
            command,
            BranchNameKey::new(ProjectName::new(self.project), self.branch),
            self.commit,
            self.user,
            self.diff,
        )
    }
}
