//! Local member directory

use crate::error::{Error, Result};
use crate::types::{KycStatus, Member};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;

/// Local mirror of member compliance state
#[async_trait]
pub trait MemberDirectory: Send + Sync {
    /// Look a member up
    async fn get(&self, member_id: &str) -> Result<Option<Member>>;

    /// Insert or replace a member
    async fn upsert(&self, member: Member) -> Result<()>;

    /// Mirror a KYC change
    async fn set_kyc_status(
        &self,
        member_id: &str,
        status: KycStatus,
        jurisdiction: Option<u16>,
        flags: Option<u128>,
    ) -> Result<Member>;
}

/// In-memory directory
#[derive(Debug, Clone, Default)]
pub struct InMemoryMemberDirectory {
    members: Arc<DashMap<String, Member>>,
}

impl InMemoryMemberDirectory {
    /// Empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of members
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the directory is empty
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[async_trait]
impl MemberDirectory for InMemoryMemberDirectory {
    async fn get(&self, member_id: &str) -> Result<Option<Member>> {
        Ok(self.members.get(member_id).map(|m| m.value().clone()))
    }

    async fn upsert(&self, member: Member) -> Result<()> {
        if member.member_id.trim().is_empty() {
            return Err(Error::InvalidInput("member id is empty".to_string()));
        }
        self.members.insert(member.member_id.clone(), member);
        Ok(())
    }

    async fn set_kyc_status(
        &self,
        member_id: &str,
        status: KycStatus,
        jurisdiction: Option<u16>,
        flags: Option<u128>,
    ) -> Result<Member> {
        let mut entry = self
            .members
            .get_mut(member_id)
            .ok_or_else(|| Error::MemberNotFound(member_id.to_string()))?;
        let member = entry.value_mut();
        member.kyc_status = status;
        if let Some(jurisdiction) = jurisdiction {
            member.jurisdiction = jurisdiction;
        }
        if let Some(flags) = flags {
            member.flags = flags;
        }
        member.updated_at = Utc::now();
        Ok(member.clone())
    }
}
