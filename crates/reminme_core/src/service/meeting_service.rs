//! Meeting use-case service.
//!
//! # Responsibility
//! - Validate meeting, child record and context card payloads.
//! - Render a compact, prompt-ready summary of a meeting for generation.

use crate::model::meeting::{
    AgendaItem, AgendaItemPatch, Attendee, AttendeeDraft, AttendeePatch, ContextCard,
    ContextCardDraft, Meeting, MeetingDetail, MeetingDraft, MeetingFollowUp,
    MeetingFollowUpDraft, MeetingFollowUpPatch, MeetingNote, MeetingQuestion, QuestionDraft,
    QuestionPatch,
};
use crate::model::{require_text, ContentDraft, RecordId, Tags, UserId};
use crate::repo::meeting_repo::{ContextCardQuery, MeetingQuery, MeetingRepository};
use crate::repo::{RepoError, RepoResult};

/// Use-case service for meetings and their child records.
pub struct MeetingService<R: MeetingRepository> {
    repo: R,
}

impl<R: MeetingRepository> MeetingService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn create_meeting(&self, owner: UserId, draft: MeetingDraft) -> RepoResult<Meeting> {
        let draft = draft.cleaned()?;
        self.repo.create_meeting(owner, &draft)
    }

    pub fn update_meeting(
        &self,
        owner: UserId,
        id: RecordId,
        draft: MeetingDraft,
    ) -> RepoResult<Meeting> {
        let draft = draft.cleaned()?;
        self.repo.update_meeting(owner, id, &draft)
    }

    pub fn get_meeting(&self, owner: UserId, id: RecordId) -> RepoResult<MeetingDetail> {
        self.repo
            .get_meeting_detail(owner, id)?
            .ok_or(RepoError::not_found("meeting", id))
    }

    pub fn list_meetings(&self, owner: UserId, query: &MeetingQuery) -> RepoResult<Vec<Meeting>> {
        self.repo.list_meetings(owner, query)
    }

    pub fn delete_meeting(&self, owner: UserId, id: RecordId) -> RepoResult<()> {
        self.repo.delete_meeting(owner, id)
    }

    pub fn add_attendee(
        &self,
        owner: UserId,
        meeting_id: RecordId,
        draft: AttendeeDraft,
    ) -> RepoResult<Attendee> {
        let draft = draft.cleaned()?;
        self.repo.add_attendee(owner, meeting_id, &draft)
    }

    pub fn patch_attendee(
        &self,
        owner: UserId,
        meeting_id: RecordId,
        id: RecordId,
        patch: AttendeePatch,
    ) -> RepoResult<Attendee> {
        patch.validate()?;
        self.repo.patch_attendee(owner, meeting_id, id, &patch)
    }

    pub fn delete_attendee(
        &self,
        owner: UserId,
        meeting_id: RecordId,
        id: RecordId,
    ) -> RepoResult<()> {
        self.repo.delete_attendee(owner, meeting_id, id)
    }

    pub fn add_agenda_item(
        &self,
        owner: UserId,
        meeting_id: RecordId,
        item: &str,
    ) -> RepoResult<AgendaItem> {
        require_text("item", item)?;
        self.repo.add_agenda_item(owner, meeting_id, item.trim())
    }

    pub fn patch_agenda_item(
        &self,
        owner: UserId,
        meeting_id: RecordId,
        id: RecordId,
        patch: AgendaItemPatch,
    ) -> RepoResult<AgendaItem> {
        if let Some(item) = patch.item.as_deref() {
            require_text("item", item)?;
        }
        self.repo.patch_agenda_item(owner, meeting_id, id, &patch)
    }

    pub fn delete_agenda_item(
        &self,
        owner: UserId,
        meeting_id: RecordId,
        id: RecordId,
    ) -> RepoResult<()> {
        self.repo.delete_agenda_item(owner, meeting_id, id)
    }

    pub fn add_note(
        &self,
        owner: UserId,
        meeting_id: RecordId,
        draft: ContentDraft,
        tags: Tags,
    ) -> RepoResult<MeetingNote> {
        let draft = draft.cleaned()?;
        self.repo
            .add_note(owner, meeting_id, &draft.content, &tags.normalized())
    }

    pub fn update_note(
        &self,
        owner: UserId,
        meeting_id: RecordId,
        id: RecordId,
        draft: ContentDraft,
        tags: Tags,
    ) -> RepoResult<MeetingNote> {
        let draft = draft.cleaned()?;
        self.repo
            .update_note(owner, meeting_id, id, &draft.content, &tags.normalized())
    }

    pub fn delete_note(&self, owner: UserId, meeting_id: RecordId, id: RecordId) -> RepoResult<()> {
        self.repo.delete_note(owner, meeting_id, id)
    }

    pub fn add_question(
        &self,
        owner: UserId,
        meeting_id: RecordId,
        draft: QuestionDraft,
    ) -> RepoResult<MeetingQuestion> {
        let draft = draft.cleaned()?;
        self.repo.add_question(owner, meeting_id, &draft)
    }

    /// Appends generated questions. Blank questions are dropped.
    pub fn append_generated_questions(
        &self,
        owner: UserId,
        meeting_id: RecordId,
        drafts: Vec<QuestionDraft>,
    ) -> RepoResult<Vec<MeetingQuestion>> {
        let drafts: Vec<QuestionDraft> = drafts
            .into_iter()
            .filter_map(|draft| draft.cleaned().ok())
            .collect();
        self.repo.append_questions(owner, meeting_id, &drafts)
    }

    pub fn patch_question(
        &self,
        owner: UserId,
        meeting_id: RecordId,
        id: RecordId,
        patch: QuestionPatch,
    ) -> RepoResult<MeetingQuestion> {
        self.repo.patch_question(owner, meeting_id, id, &patch)
    }

    pub fn delete_question(
        &self,
        owner: UserId,
        meeting_id: RecordId,
        id: RecordId,
    ) -> RepoResult<()> {
        self.repo.delete_question(owner, meeting_id, id)
    }

    pub fn add_follow_up(
        &self,
        owner: UserId,
        meeting_id: RecordId,
        draft: MeetingFollowUpDraft,
    ) -> RepoResult<MeetingFollowUp> {
        let draft = draft.cleaned()?;
        self.repo.add_follow_up(owner, meeting_id, &draft)
    }

    pub fn patch_follow_up(
        &self,
        owner: UserId,
        meeting_id: RecordId,
        id: RecordId,
        patch: MeetingFollowUpPatch,
    ) -> RepoResult<MeetingFollowUp> {
        if let Some(description) = patch.description.as_deref() {
            require_text("description", description)?;
        }
        self.repo.patch_follow_up(owner, meeting_id, id, &patch)
    }

    pub fn delete_follow_up(
        &self,
        owner: UserId,
        meeting_id: RecordId,
        id: RecordId,
    ) -> RepoResult<()> {
        self.repo.delete_follow_up(owner, meeting_id, id)
    }

    pub fn create_context_card(
        &self,
        owner: UserId,
        draft: ContextCardDraft,
    ) -> RepoResult<ContextCard> {
        let draft = draft.cleaned()?;
        self.repo.create_context_card(owner, &draft)
    }

    pub fn update_context_card(
        &self,
        owner: UserId,
        id: RecordId,
        draft: ContextCardDraft,
    ) -> RepoResult<ContextCard> {
        let draft = draft.cleaned()?;
        self.repo.update_context_card(owner, id, &draft)
    }

    pub fn list_context_cards(
        &self,
        owner: UserId,
        query: &ContextCardQuery,
    ) -> RepoResult<Vec<ContextCard>> {
        self.repo.list_context_cards(owner, query)
    }

    pub fn delete_context_card(&self, owner: UserId, id: RecordId) -> RepoResult<()> {
        self.repo.delete_context_card(owner, id)
    }
}

/// Renders the meeting as plain-text lines for a generation prompt.
pub fn meeting_brief(detail: &MeetingDetail) -> String {
    let meeting = &detail.meeting;
    let mut lines = vec![format!("Title: {}", meeting.title)];
    if let Some(purpose) = meeting.purpose.as_deref() {
        lines.push(format!("Purpose: {purpose}"));
    }
    if let Some(scheduled_at) = meeting.scheduled_at.as_deref() {
        lines.push(format!("Scheduled: {scheduled_at}"));
    }
    if !detail.attendees.is_empty() {
        let attendees: Vec<String> = detail
            .attendees
            .iter()
            .map(|attendee| match attendee.role.as_deref() {
                Some(role) => format!("{} ({role})", attendee.name),
                None => attendee.name.clone(),
            })
            .collect();
        lines.push(format!("Attendees: {}", attendees.join(", ")));
    }
    if !detail.agenda.is_empty() {
        lines.push("Agenda:".to_string());
        lines.extend(detail.agenda.iter().map(|item| format!("- {}", item.item)));
    }
    if !detail.notes.is_empty() {
        lines.push("Notes:".to_string());
        lines.extend(detail.notes.iter().map(|note| format!("- {}", note.content)));
    }
    if !detail.questions.is_empty() {
        lines.push("Already planned questions:".to_string());
        lines.extend(
            detail
                .questions
                .iter()
                .map(|question| format!("- {}", question.question)),
        );
    }
    lines.join("\n")
}
