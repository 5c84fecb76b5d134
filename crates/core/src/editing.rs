//! Edit session for a single user row.
//!
//! ```text
//! Viewing --begin--> Editing --submit--> Saving --saved--> Viewing
//!                      |  ^                 |
//!                   cancel|                 save_failed
//!                      v  +-----------------+
//!                   Viewing
//! ```
//!
//! Entering `Editing` snapshots the record as the initial form values. The
//! snapshot (including its version) is what a save is based on, so a failed
//! save can be retried or cancelled without losing it.

use chrono::{DateTime, Utc};

use crate::projection::{
    UserDraft, UserFormValues, ValidationErrors, form_values_to_user, user_to_form_values,
    validate,
};
use crate::types::{IdentityScheme, UserRecord};

/// Errors from invalid transitions or an invalid submit.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditError {
    #[error("no edit in progress")]
    NotEditing,

    #[error("an edit is already in progress")]
    AlreadyEditing,

    #[error("a save is in flight")]
    SaveInFlight,

    #[error(transparent)]
    Invalid(#[from] ValidationErrors),
}

/// An open edit form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditForm {
    /// The record as it was when editing began; `None` when creating.
    pub original: Option<UserRecord>,
    /// Form values at the start of the edit.
    pub initial: UserFormValues,
    /// Current form values.
    pub values: UserFormValues,
    /// Validation messages from the last submit.
    pub errors: ValidationErrors,
    /// Message from the last failed save.
    pub save_error: Option<String>,
}

impl EditForm {
    /// Whether the values differ from the snapshot.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.values != self.initial
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum EditState {
    #[default]
    Viewing,
    Editing(EditForm),
    Saving(EditForm),
}

/// State machine driving one row's edit form.
#[derive(Debug, Clone, Default)]
pub struct EditSession {
    state: EditState,
    scheme: IdentityScheme,
}

impl EditSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A session whose new records are keyed under `scheme`.
    #[must_use]
    pub const fn for_scheme(scheme: IdentityScheme) -> Self {
        Self {
            state: EditState::Viewing,
            scheme,
        }
    }

    #[must_use]
    pub const fn state(&self) -> &EditState {
        &self.state
    }

    /// The open form, while editing or saving.
    #[must_use]
    pub const fn form(&self) -> Option<&EditForm> {
        match &self.state {
            EditState::Viewing => None,
            EditState::Editing(form) | EditState::Saving(form) => Some(form),
        }
    }

    /// Start editing `record`, or a new user when `None`.
    ///
    /// # Errors
    ///
    /// Fails unless the session is viewing.
    pub fn begin(&mut self, record: Option<UserRecord>) -> Result<(), EditError> {
        if !matches!(self.state, EditState::Viewing) {
            return Err(EditError::AlreadyEditing);
        }
        let initial = user_to_form_values(record.as_ref());
        self.state = EditState::Editing(EditForm {
            original: record,
            values: initial.clone(),
            initial,
            errors: ValidationErrors::default(),
            save_error: None,
        });
        Ok(())
    }

    /// Replace the current form values.
    ///
    /// # Errors
    ///
    /// Fails unless the session is editing.
    pub fn update(&mut self, values: UserFormValues) -> Result<(), EditError> {
        match &mut self.state {
            EditState::Editing(form) => {
                form.values = values;
                Ok(())
            }
            EditState::Saving(_) => Err(EditError::SaveInFlight),
            EditState::Viewing => Err(EditError::NotEditing),
        }
    }

    /// Discard the edit and return to viewing.
    ///
    /// # Errors
    ///
    /// Fails while a save is in flight.
    pub fn cancel(&mut self) -> Result<(), EditError> {
        match self.state {
            EditState::Saving(_) => Err(EditError::SaveInFlight),
            _ => {
                self.state = EditState::Viewing;
                Ok(())
            }
        }
    }

    /// Validate and produce the draft to save.
    ///
    /// On success the session waits in `Saving` for [`Self::saved`] or
    /// [`Self::save_failed`]. On validation failure it stays in `Editing`
    /// with the field messages attached.
    ///
    /// # Errors
    ///
    /// Returns [`EditError::Invalid`] with the field messages, or a
    /// transition error when not editing.
    pub fn submit(&mut self, now: DateTime<Utc>) -> Result<UserDraft, EditError> {
        let form = match &mut self.state {
            EditState::Editing(form) => form,
            EditState::Saving(_) => return Err(EditError::SaveInFlight),
            EditState::Viewing => return Err(EditError::NotEditing),
        };

        if let Err(errors) = validate(&form.values) {
            form.errors = errors.clone();
            return Err(EditError::Invalid(errors));
        }

        form.errors = ValidationErrors::default();
        form.save_error = None;
        let draft = form_values_to_user(&form.values, form.original.as_ref(), self.scheme, now);

        let form = std::mem::replace(&mut self.state, EditState::Viewing);
        if let EditState::Editing(form) = form {
            self.state = EditState::Saving(form);
        }
        Ok(draft)
    }

    /// The save went through.
    ///
    /// # Errors
    ///
    /// Fails unless a save is in flight.
    pub fn saved(&mut self) -> Result<(), EditError> {
        if !matches!(self.state, EditState::Saving(_)) {
            return Err(EditError::NotEditing);
        }
        self.state = EditState::Viewing;
        Ok(())
    }

    /// The save failed; reopen the form with `message` and the same snapshot.
    ///
    /// # Errors
    ///
    /// Fails unless a save is in flight.
    pub fn save_failed(&mut self, message: impl Into<String>) -> Result<(), EditError> {
        let state = std::mem::replace(&mut self.state, EditState::Viewing);
        match state {
            EditState::Saving(mut form) => {
                form.save_error = Some(message.into());
                self.state = EditState::Editing(form);
                Ok(())
            }
            other => {
                self.state = other;
                Err(EditError::NotEditing)
            }
        }
    }
}
