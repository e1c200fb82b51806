//! Business use-case service.
//!
//! # Invariants
//! - Drafts are cleaned before they reach the repository.
//! - Org chart saves are validated as a whole before any row is touched.

use crate::model::business::{
    Business, BusinessDraft, BusinessNote, BusinessPerson, BusinessPersonDraft, OrgChart,
    OrgChartDraft,
};
use crate::model::{ContentDraft, RecordId, Tags, UserId};
use crate::repo::business_repo::BusinessRepository;
use crate::repo::{RepoError, RepoResult};

/// Use-case service for businesses and their child records.
pub struct BusinessService<R: BusinessRepository> {
    repo: R,
}

impl<R: BusinessRepository> BusinessService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn create_business(&self, owner: UserId, draft: BusinessDraft) -> RepoResult<Business> {
        let draft = draft.cleaned()?;
        self.repo.create_business(owner, &draft)
    }

    pub fn update_business(
        &self,
        owner: UserId,
        id: RecordId,
        draft: BusinessDraft,
    ) -> RepoResult<Business> {
        let draft = draft.cleaned()?;
        self.repo.update_business(owner, id, &draft)
    }

    pub fn get_business(&self, owner: UserId, id: RecordId) -> RepoResult<Business> {
        self.repo
            .get_business(owner, id)?
            .ok_or(RepoError::not_found("business", id))
    }

    pub fn list_businesses(&self, owner: UserId) -> RepoResult<Vec<Business>> {
        self.repo.list_businesses(owner)
    }

    pub fn delete_business(&self, owner: UserId, id: RecordId) -> RepoResult<()> {
        self.repo.delete_business(owner, id)
    }

    pub fn add_person(
        &self,
        owner: UserId,
        business_id: RecordId,
        draft: BusinessPersonDraft,
    ) -> RepoResult<BusinessPerson> {
        let draft = draft.cleaned()?;
        self.repo.add_business_person(owner, business_id, &draft)
    }

    pub fn update_person(
        &self,
        owner: UserId,
        id: RecordId,
        draft: BusinessPersonDraft,
    ) -> RepoResult<BusinessPerson> {
        let draft = draft.cleaned()?;
        self.repo.update_business_person(owner, id, &draft)
    }

    pub fn list_people(
        &self,
        owner: UserId,
        business_id: RecordId,
    ) -> RepoResult<Vec<BusinessPerson>> {
        self.repo.list_business_people(owner, business_id)
    }

    pub fn delete_person(&self, owner: UserId, id: RecordId) -> RepoResult<()> {
        self.repo.delete_business_person(owner, id)
    }

    pub fn add_note(
        &self,
        owner: UserId,
        business_id: RecordId,
        draft: ContentDraft,
        tags: Tags,
    ) -> RepoResult<BusinessNote> {
        let draft = draft.cleaned()?;
        self.repo
            .add_business_note(owner, business_id, &draft.content, &tags.normalized())
    }

    pub fn list_notes(
        &self,
        owner: UserId,
        business_id: RecordId,
    ) -> RepoResult<Vec<BusinessNote>> {
        self.repo.list_business_notes(owner, business_id)
    }

    pub fn delete_note(&self, owner: UserId, id: RecordId) -> RepoResult<()> {
        self.repo.delete_business_note(owner, id)
    }

    pub fn get_org_chart(&self, owner: UserId, business_id: RecordId) -> RepoResult<OrgChart> {
        self.repo.get_org_chart(owner, business_id)
    }

    /// Replaces the business org chart with `draft`.
    pub fn save_org_chart(
        &self,
        owner: UserId,
        business_id: RecordId,
        draft: OrgChartDraft,
    ) -> RepoResult<OrgChart> {
        draft.validate()?;
        self.repo.replace_org_chart(owner, business_id, &draft)
    }
}
