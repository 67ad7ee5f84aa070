use ratatui::crossterm::event::{KeyCode, KeyEvent};
use tracing::trace;

use crate::inputter::Inputter;
use crate::record::{Collection, ProjectType, Record, split_list};
use crate::store::{BlogDraft, ProjectDraft, RecordDraft};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKey {
    Title,
    Content,
    Description,
    ProjectType,
    GithubClient,
    GithubServer,
    LiveSite,
    Technologies,
    Features,
    Tags,
    Thumbnail,
}

impl FieldKey {
    pub fn label(&self) -> &'static str {
        match self {
            FieldKey::Title => "Title",
            FieldKey::Content => "Content",
            FieldKey::Description => "Description",
            FieldKey::ProjectType => "Type (FullStack, Frontend, Backend)",
            FieldKey::GithubClient => "GitHub client",
            FieldKey::GithubServer => "GitHub server",
            FieldKey::LiveSite => "Live site",
            FieldKey::Technologies => "Technologies (comma separated)",
            FieldKey::Features => "Features (comma separated)",
            FieldKey::Tags => "Tags (comma separated)",
            FieldKey::Thumbnail => "Thumbnail url",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormField {
    pub key: FieldKey,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FormAction {
    Continue,
    Submit,
    Cancel,
}

/// Create or edit form for one record.
pub struct EditForm {
    collection: Collection,
    target: Option<u64>,
    heading: String,
    fields: Vec<FormField>,
    focus: usize,
    input: Inputter,
    pub error: Option<String>,
    pub submitting: bool,
}

impl EditForm {
    pub fn blank(collection: Collection) -> Self {
        let keys: &[FieldKey] = match collection {
            Collection::Blogs => &[FieldKey::Title, FieldKey::Content, FieldKey::Thumbnail, FieldKey::Tags],
            Collection::Projects => &[
                FieldKey::Title,
                FieldKey::Description,
                FieldKey::ProjectType,
                FieldKey::GithubClient,
                FieldKey::GithubServer,
                FieldKey::LiveSite,
                FieldKey::Technologies,
                FieldKey::Features,
                FieldKey::Thumbnail,
            ],
        };
        let fields = keys
            .iter()
            .map(|&key| FormField {
                key,
                value: String::new(),
            })
            .collect();
        EditForm::new(collection, None, format!("New {}", collection.noun().to_lowercase()), fields)
    }

    /// A form pre-populated from the record it edits.
    pub fn from_record(record: &Record) -> Self {
        let mut form = EditForm::blank(record.collection());
        let text = |v: &Option<String>| v.clone().unwrap_or_default();
        for field in form.fields.iter_mut() {
            field.value = match (record, field.key) {
                (_, FieldKey::Title) => record.title().to_string(),
                (Record::Blog(b), FieldKey::Content) => b.content.clone(),
                (Record::Blog(b), FieldKey::Thumbnail) => text(&b.thumbnail),
                (Record::Blog(b), FieldKey::Tags) => b.tags.join(", "),
                (Record::Project(p), FieldKey::Description) => text(&p.description),
                (Record::Project(p), FieldKey::ProjectType) => p.project_type.to_string(),
                (Record::Project(p), FieldKey::GithubClient) => text(&p.github_client),
                (Record::Project(p), FieldKey::GithubServer) => text(&p.github_server),
                (Record::Project(p), FieldKey::LiveSite) => text(&p.live_link),
                (Record::Project(p), FieldKey::Technologies) => p.technologies.join(", "),
                (Record::Project(p), FieldKey::Features) => p.features.join(", "),
                (Record::Project(p), FieldKey::Thumbnail) => text(&p.thumbnail),
                _ => String::new(),
            };
        }
        form.target = Some(record.id());
        form.heading = format!("Edit: {}", record.title());
        form.input.set(&form.fields[0].value);
        form
    }

    fn new(collection: Collection, target: Option<u64>, heading: String, fields: Vec<FormField>) -> Self {
        EditForm {
            collection,
            target,
            heading,
            fields,
            focus: 0,
            input: Inputter::default(),
            error: None,
            submitting: false,
        }
    }

    /// Id of the edited record, `None` when creating.
    pub fn target(&self) -> Option<u64> {
        self.target
    }

    pub fn heading(&self) -> &str {
        &self.heading
    }

    pub fn fields(&self) -> &[FormField] {
        &self.fields
    }

    pub fn focus(&self) -> usize {
        self.focus
    }

    pub fn cursor(&self) -> usize {
        self.input.get().cursor
    }

    pub fn read(&mut self, key: KeyEvent) -> FormAction {
        match key.code {
            KeyCode::Esc => return FormAction::Cancel,
            KeyCode::Enter => return FormAction::Submit,
            KeyCode::Tab | KeyCode::Down => self.move_focus(1),
            KeyCode::BackTab | KeyCode::Up => self.move_focus(-1),
            _ => {
                self.input.read(key);
                self.fields[self.focus].value = self.input.value().to_string();
            }
        }
        FormAction::Continue
    }

    fn move_focus(&mut self, delta: isize) {
        let n = self.fields.len() as isize;
        self.focus = ((self.focus as isize + delta).rem_euclid(n)) as usize;
        self.input.set(&self.fields[self.focus].value);
        trace!("Form focus on {:?}", self.fields[self.focus].key);
    }

    fn value(&self, key: FieldKey) -> &str {
        self.fields
            .iter()
            .find(|f| f.key == key)
            .map(|f| f.value.trim())
            .unwrap_or("")
    }

    fn optional(&self, key: FieldKey) -> Option<String> {
        Some(self.value(key).to_string()).filter(|v| !v.is_empty())
    }

    fn required(&self, key: FieldKey, field: &'static str) -> Result<String, ValidationError> {
        match self.value(key) {
            "" => Err(ValidationError {
                field,
                message: format!("{} is required", key.label()),
            }),
            v => Ok(v.to_string()),
        }
    }

    fn required_list(&self, key: FieldKey, field: &'static str, what: &str) -> Result<Vec<String>, ValidationError> {
        let items = split_list(self.value(key));
        if items.is_empty() {
            return Err(ValidationError {
                field,
                message: format!("At least one {what} is required"),
            });
        }
        Ok(items)
    }

    pub fn validate(&self) -> Result<RecordDraft, ValidationError> {
        match self.collection {
            Collection::Blogs => Ok(RecordDraft::Blog(BlogDraft {
                title: self.required(FieldKey::Title, "title")?,
                content: self.required(FieldKey::Content, "content")?,
                thumbnail: self.optional(FieldKey::Thumbnail),
                tags: split_list(self.value(FieldKey::Tags)),
            })),
            Collection::Projects => Ok(RecordDraft::Project(ProjectDraft {
                title: self.required(FieldKey::Title, "title")?,
                description: self.required(FieldKey::Description, "description")?,
                project_type: self.value(FieldKey::ProjectType).parse::<ProjectType>().map_err(|_| {
                    ValidationError {
                        field: "projectType",
                        message: "Type must be FullStack, Frontend or Backend".into(),
                    }
                })?,
                github_client: self.optional(FieldKey::GithubClient),
                github_server: self.optional(FieldKey::GithubServer),
                live_site: self.optional(FieldKey::LiveSite),
                technologies: self.required_list(FieldKey::Technologies, "technologies", "technology")?,
                features: self.required_list(FieldKey::Features, "features", "feature")?,
                thumbnail: self.optional(FieldKey::Thumbnail),
            })),
        }
    }
}
