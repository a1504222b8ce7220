use crate::models::NewToolDraft;

pub(crate) const MAX_MOUNT_POINT_LEN: usize = 63;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub(crate) enum MountPointError {
    #[error("Url path is required")]
    Empty,
    #[error("Url path must be at most 63 characters")]
    TooLong,
    #[error("Url path must start with a lowercase letter")]
    BadStart,
    #[error("Url path may only contain lowercase letters, digits and '-' (found {0:?})")]
    BadChar(char),
}

/// Lowercase letter first, then lowercase letters, digits or `-`.
pub(crate) fn check_mount_point_syntax(mount_point: &str) -> Result<(), MountPointError> {
    let mut chars = mount_point.chars();
    let Some(first) = chars.next() else {
        return Err(MountPointError::Empty);
    };
    if mount_point.chars().count() > MAX_MOUNT_POINT_LEN {
        return Err(MountPointError::TooLong);
    }
    if !first.is_ascii_lowercase() {
        return Err(MountPointError::BadStart);
    }
    if let Some(bad) = chars.find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')) {
        return Err(MountPointError::BadChar(bad));
    }
    Ok(())
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum MountPointStatus {
    Unchecked,
    Checking,
    Available,
    Taken,
    Invalid(MountPointError),
    Failed(String),
}

impl MountPointStatus {
    pub fn warning(&self) -> Option<String> {
        match self {
            Self::Taken => Some("This url path is already in use.".to_string()),
            Self::Invalid(e) => Some(e.to_string()),
            Self::Failed(e) => Some(format!("Could not check url path: {e}")),
            _ => None,
        }
    }
}

/// Tracks blur-triggered server checks of the url path field.
///
/// Every check gets a ticket; a result is applied only for the newest ticket
/// and only while the field still holds the value that was checked.
#[derive(Clone, Debug)]
pub(crate) struct MountPointValidator {
    next_ticket: u64,
    pending: Option<(u64, String)>,
    status: MountPointStatus,
}

impl Default for MountPointValidator {
    fn default() -> Self {
        Self {
            next_ticket: 1,
            pending: None,
            status: MountPointStatus::Unchecked,
        }
    }
}

impl MountPointValidator {
    pub fn status(&self) -> &MountPointStatus {
        &self.status
    }

    /// Start checking `value`. Returns the ticket to tag the request with, or
    /// `None` when the value fails local checks and no request should be sent.
    pub fn begin(&mut self, value: &str) -> Option<u64> {
        if let Err(e) = check_mount_point_syntax(value) {
            // Invalidate anything still in flight.
            self.pending = None;
            self.status = MountPointStatus::Invalid(e);
            return None;
        }
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.pending = Some((ticket, value.to_string()));
        self.status = MountPointStatus::Checking;
        Some(ticket)
    }

    /// Apply a server answer. Returns `false` for stale answers, which are dropped.
    pub fn resolve(
        &mut self,
        ticket: u64,
        current_value: &str,
        result: Result<bool, String>,
    ) -> bool {
        let Some((pending_ticket, checked)) = &self.pending else {
            return false;
        };
        if *pending_ticket != ticket {
            return false;
        }
        if checked != current_value {
            self.pending = None;
            self.status = MountPointStatus::Unchecked;
            return false;
        }

        self.status = match result {
            Ok(true) => MountPointStatus::Taken,
            Ok(false) => MountPointStatus::Available,
            Err(e) => MountPointStatus::Failed(e),
        };
        self.pending = None;
        true
    }

    /// The field was edited; any earlier verdict no longer applies.
    pub fn reset(&mut self) {
        self.pending = None;
        self.status = MountPointStatus::Unchecked;
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub(crate) enum DraftError {
    #[error("Pick a tool to install first")]
    NoToolSelected,
    #[error("Label is required")]
    MissingLabel,
    #[error(transparent)]
    MountPoint(#[from] MountPointError),
    #[error("A tool is already mounted at {0:?}")]
    AlreadyMounted(String),
}

/// Local checks before a draft may be submitted.
pub(crate) fn validate_draft(
    draft: &NewToolDraft,
    mounted: &[String],
    status: &MountPointStatus,
) -> Result<(), DraftError> {
    if draft.mount_label.trim().is_empty() {
        return Err(DraftError::MissingLabel);
    }
    check_mount_point_syntax(&draft.mount_point)?;
    if *status == MountPointStatus::Taken || mounted.iter().any(|m| *m == draft.mount_point) {
        return Err(DraftError::AlreadyMounted(draft.mount_point.clone()));
    }
    Ok(())
}
