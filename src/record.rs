use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The two kinds of records the portfolio api serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Collection {
    Blogs,
    Projects,
}

impl Collection {
    pub fn label(&self) -> &'static str {
        match self {
            Collection::Blogs => "blogs",
            Collection::Projects => "projects",
        }
    }

    /// Singular, capitalized name used in notifications.
    pub fn noun(&self) -> &'static str {
        match self {
            Collection::Blogs => "Blog",
            Collection::Projects => "Project",
        }
    }

    pub fn columns(&self) -> &'static [Column] {
        match self {
            Collection::Blogs => &[Column::Title, Column::Tags, Column::Views, Column::CreatedAt],
            Collection::Projects => &[
                Column::Title,
                Column::ProjectType,
                Column::Technologies,
                Column::Features,
                Column::Views,
                Column::CreatedAt,
            ],
        }
    }

    pub fn other(&self) -> Collection {
        match self {
            Collection::Blogs => Collection::Projects,
            Collection::Projects => Collection::Blogs,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Title,
    Tags,
    ProjectType,
    Technologies,
    Features,
    Views,
    CreatedAt,
}

impl Column {
    pub fn name(&self) -> &'static str {
        match self {
            Column::Title => "title",
            Column::Tags => "tags",
            Column::ProjectType => "projectType",
            Column::Technologies => "technologies",
            Column::Features => "features",
            Column::Views => "views",
            Column::CreatedAt => "createdAt",
        }
    }

    pub fn header(&self, collection: Collection) -> &'static str {
        match (self, collection) {
            (Column::Title, _) => "Title",
            (Column::Tags, _) => "Tags",
            (Column::ProjectType, _) => "Type",
            (Column::Technologies, _) => "Technologies",
            (Column::Features, _) => "Features",
            (Column::Views, _) => "Views",
            (Column::CreatedAt, Collection::Blogs) => "Published",
            (Column::CreatedAt, Collection::Projects) => "Created",
        }
    }
}

impl FromStr for Column {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "title" => Ok(Column::Title),
            "tags" => Ok(Column::Tags),
            "projecttype" | "type" => Ok(Column::ProjectType),
            "technologies" => Ok(Column::Technologies),
            "features" => Ok(Column::Features),
            "views" => Ok(Column::Views),
            "createdat" | "created" | "published" => Ok(Column::CreatedAt),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectType {
    FullStack,
    Frontend,
    Backend,
}

impl fmt::Display for ProjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProjectType::FullStack => "FullStack",
            ProjectType::Frontend => "Frontend",
            ProjectType::Backend => "Backend",
        };
        f.write_str(name)
    }
}

impl FromStr for ProjectType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fullstack" => Ok(ProjectType::FullStack),
            "frontend" => Ok(ProjectType::Frontend),
            "backend" => Ok(ProjectType::Backend),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blog {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub views: u64,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub project_type: ProjectType,
    #[serde(default)]
    pub github_client: Option<String>,
    #[serde(default)]
    pub github_server: Option<String>,
    #[serde(default, alias = "liveSite")]
    pub live_link: Option<String>,
    #[serde(default)]
    pub technologies: Vec<String>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub views: u64,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Blog(Blog),
    Project(Project),
}

impl Record {
    pub fn id(&self) -> u64 {
        match self {
            Record::Blog(b) => b.id,
            Record::Project(p) => p.id,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Record::Blog(b) => &b.title,
            Record::Project(p) => &p.title,
        }
    }

    pub fn collection(&self) -> Collection {
        match self {
            Record::Blog(_) => Collection::Blogs,
            Record::Project(_) => Collection::Projects,
        }
    }

    /// Display text of one table cell. Columns the record does not carry render empty.
    pub fn cell(&self, column: Column) -> String {
        match (self, column) {
            (_, Column::Title) => self.title().to_string(),
            (Record::Blog(b), Column::Tags) => abbreviate(&b.tags, 3),
            (Record::Blog(b), Column::Views) => b.views.to_string(),
            (Record::Blog(b), Column::CreatedAt) => format_date(&b.created_at),
            (Record::Project(p), Column::ProjectType) => p.project_type.to_string(),
            (Record::Project(p), Column::Technologies) => abbreviate(&p.technologies, 3),
            (Record::Project(p), Column::Features) => abbreviate(&p.features, 2),
            (Record::Project(p), Column::Views) => p.views.to_string(),
            (Record::Project(p), Column::CreatedAt) => format_date(&p.created_at),
            _ => String::new(),
        }
    }

    /// Every field of the record, in display order.
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        let optional = |v: &Option<String>| v.clone().unwrap_or_default();
        match self {
            Record::Blog(b) => vec![
                ("ID", b.id.to_string()),
                ("Title", b.title.clone()),
                ("Tags", b.tags.join(", ")),
                ("Views", b.views.to_string()),
                ("Published", format_date(&b.created_at)),
                ("Updated", b.updated_at.as_deref().map(format_date).unwrap_or_default()),
                ("Thumbnail", optional(&b.thumbnail)),
                ("Content", b.content.clone()),
            ],
            Record::Project(p) => vec![
                ("ID", p.id.to_string()),
                ("Title", p.title.clone()),
                ("Type", p.project_type.to_string()),
                ("Technologies", p.technologies.join(", ")),
                ("Features", p.features.join(", ")),
                ("Views", p.views.to_string()),
                ("Created", format_date(&p.created_at)),
                ("Updated", p.updated_at.as_deref().map(format_date).unwrap_or_default()),
                ("Live site", optional(&p.live_link)),
                ("GitHub client", optional(&p.github_client)),
                ("GitHub server", optional(&p.github_server)),
                ("Thumbnail", optional(&p.thumbnail)),
                ("Description", optional(&p.description)),
            ],
        }
    }

    /// All fields as one csv line, quoting values that need it.
    pub fn to_csv_row(&self) -> String {
        self.fields()
            .iter()
            .map(|(_, value)| wrap_cell_content(value))
            .collect::<Vec<String>>()
            .join(",")
    }
}

fn abbreviate(items: &[String], keep: usize) -> String {
    let mut out = items.iter().take(keep).cloned().collect::<Vec<String>>().join(", ");
    if items.len() > keep {
        out.push_str(&format!(" +{} more", items.len() - keep));
    }
    out
}

/// Renders api timestamps as dd/mm/yyyy, leaving anything unparseable untouched.
pub fn format_date(raw: &str) -> String {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return ts.format("%d/%m/%Y").to_string();
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.format("%d/%m/%Y").to_string();
    }
    raw.to_string()
}

fn wrap_cell_content(c: &str) -> String {
    let needs_escaping = c.contains('"');
    let needs_wrapping = c.chars().any(|c| matches!(c, ' ' | '\t' | ',' | '\n'));
    let mut out = c.to_string();

    if needs_escaping {
        out = out.replace('"', "\"\"");
    }
    if needs_wrapping || needs_escaping {
        out = format!("\"{out}\"");
    }
    out
}

/// Splits a comma separated list the way the dashboard forms do, dropping blanks.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
pub mod tests {
    use super::*;

    pub fn blog(id: u64, title: &str) -> Record {
        Record::Blog(Blog {
            id,
            title: title.to_string(),
            content: format!("Body of {title}"),
            thumbnail: None,
            tags: vec!["rust".into(), "tui".into()],
            views: id * 10,
            created_at: "2025-10-08T10:00:00.000Z".into(),
            updated_at: None,
        })
    }

    #[test]
    fn blog_deserializes_from_camel_case() {
        let json = r#"{"id":1,"title":"Mastering Next.js","content":"x","tags":["nextjs"],"views":450,"createdAt":"2025-10-08","updatedAt":"2025-10-09"}"#;
        let blog: Blog = serde_json::from_str(json).unwrap();
        assert_eq!(blog.views, 450);
        assert_eq!(blog.created_at, "2025-10-08");
        assert_eq!(blog.updated_at.as_deref(), Some("2025-10-09"));
    }

    #[test]
    fn project_accepts_live_site_alias() {
        let json = r#"{"id":2,"title":"Folio","projectType":"FullStack","liveSite":"https://x.dev","technologies":[],"features":[],"views":3,"createdAt":"2025-01-01"}"#;
        let project: Project = serde_json::from_str(json).unwrap();
        assert_eq!(project.live_link.as_deref(), Some("https://x.dev"));
        assert_eq!(project.project_type, ProjectType::FullStack);
    }

    #[test]
    fn list_cells_are_abbreviated() {
        let record = Record::Blog(Blog {
            tags: vec!["a".into(), "b".into(), "c".into(), "d".into(), "e".into()],
            ..match blog(1, "t") {
                Record::Blog(b) => b,
                _ => unreachable!(),
            }
        });
        assert_eq!(record.cell(Column::Tags), "a, b, c +2 more");
        assert_eq!(record.cell(Column::ProjectType), "");
    }

    #[test]
    fn dates_render_day_first() {
        assert_eq!(format_date("2025-10-08T10:00:00.000Z"), "08/10/2025");
        assert_eq!(format_date("2025-09-22"), "22/09/2025");
        assert_eq!(format_date("yesterday"), "yesterday");
    }

    #[test]
    fn column_names_parse_case_insensitively() {
        assert_eq!("createdAt".parse::<Column>(), Ok(Column::CreatedAt));
        assert_eq!("Tags".parse::<Column>(), Ok(Column::Tags));
        assert!("checkbox".parse::<Column>().is_err());
    }

    #[test]
    fn csv_row_quotes_values_with_separators() {
        let row = blog(7, "Hello, \"world\"").to_csv_row();
        assert!(row.starts_with("7,\"Hello, \"\"world\"\"\","));
    }

    #[test]
    fn split_list_trims_and_drops_blanks() {
        assert_eq!(split_list(" rust, tui ,, "), vec!["rust", "tui"]);
        assert!(split_list("").is_empty());
    }
}
