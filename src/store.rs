use chrono::Utc;
use polars::prelude::*;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;
use tracing::{debug, info, instrument};

use crate::domain::FolioError;
use crate::record::{Blog, Collection, Project, ProjectType, Record, split_list};

/// Anything that can list and mutate the portfolio's records.
pub trait RecordStore: Send + Sync {
    fn list(&self, collection: Collection) -> Result<Vec<Record>, FolioError>;
    fn create(&self, draft: &RecordDraft) -> Result<(), FolioError>;
    fn update(&self, id: u64, draft: &RecordDraft) -> Result<(), FolioError>;
    fn delete(&self, collection: Collection, id: u64) -> Result<(), FolioError>;
    /// Short description for the status line.
    fn describe(&self) -> String;
    /// Whether `list` can return this collection at all.
    fn serves(&self, _collection: Collection) -> bool {
        true
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogDraft {
    pub title: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDraft {
    pub title: String,
    pub description: String,
    pub project_type: ProjectType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github_client: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github_server: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub live_site: Option<String>,
    pub technologies: Vec<String>,
    pub features: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

/// Validated payload of a create or edit form.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RecordDraft {
    Blog(BlogDraft),
    Project(ProjectDraft),
}

impl RecordDraft {
    pub fn collection(&self) -> Collection {
        match self {
            RecordDraft::Blog(_) => Collection::Blogs,
            RecordDraft::Project(_) => Collection::Projects,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            RecordDraft::Blog(d) => &d.title,
            RecordDraft::Project(d) => &d.title,
        }
    }

    fn apply(&self, record: &mut Record) {
        let now = Utc::now().to_rfc3339();
        match (self, record) {
            (RecordDraft::Blog(d), Record::Blog(b)) => {
                b.title = d.title.clone();
                b.content = d.content.clone();
                b.thumbnail = d.thumbnail.clone();
                b.tags = d.tags.clone();
                b.updated_at = Some(now);
            }
            (RecordDraft::Project(d), Record::Project(p)) => {
                p.title = d.title.clone();
                p.description = Some(d.description.clone());
                p.project_type = d.project_type;
                p.github_client = d.github_client.clone();
                p.github_server = d.github_server.clone();
                p.live_link = d.live_site.clone();
                p.technologies = d.technologies.clone();
                p.features = d.features.clone();
                p.thumbnail = d.thumbnail.clone();
                p.updated_at = Some(now);
            }
            _ => {}
        }
    }

    fn into_record(self, id: u64) -> Record {
        let now = Utc::now().to_rfc3339();
        match self {
            RecordDraft::Blog(d) => Record::Blog(Blog {
                id,
                title: d.title,
                content: d.content,
                thumbnail: d.thumbnail,
                tags: d.tags,
                views: 0,
                created_at: now,
                updated_at: None,
            }),
            RecordDraft::Project(d) => Record::Project(Project {
                id,
                title: d.title,
                description: Some(d.description),
                project_type: d.project_type,
                github_client: d.github_client,
                github_server: d.github_server,
                live_link: d.live_site,
                technologies: d.technologies,
                features: d.features,
                thumbnail: d.thumbnail,
                views: 0,
                created_at: now,
                updated_at: None,
            }),
        }
    }
}

// -------------------- In-memory store ---------------------- //

/// Mutable store kept in process memory, used for `--demo` sessions.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<Collection, Vec<Record>>>,
}

impl MemoryStore {
    pub fn new(records: Vec<Record>) -> Self {
        let mut by_collection: HashMap<Collection, Vec<Record>> = HashMap::new();
        for record in records {
            by_collection.entry(record.collection()).or_default().push(record);
        }
        MemoryStore {
            records: Mutex::new(by_collection),
        }
    }

    /// A store filled with sample blogs and projects.
    pub fn demo() -> Self {
        let titles = [
            "Mastering Next.js App Router",
            "Understanding Prisma with PostgreSQL",
            "Express.js Authentication Best Practices",
            "Optimizing API Performance with Caching",
            "Deploying Fullstack Apps to Vercel",
            "TypeScript Tips for Clean Code",
            "Node.js Error Handling Patterns",
            "Building REST APIs with Express and MongoDB",
            "Server-Side Rendering vs Static Site Generation",
            "Improving Lighthouse Performance in Next.js",
            "JWT vs Session-based Authentication",
            "Advanced TypeScript Utility Types Explained",
        ];
        let mut records: Vec<Record> = (1..=60u64)
            .map(|id| {
                let title = titles
                    .get(id as usize - 1)
                    .map(|t| t.to_string())
                    .unwrap_or_else(|| format!("Blog Post Example {id}"));
                let tags = match id % 4 {
                    0 => vec!["nextjs", "typescript", "react"],
                    1 => vec!["express", "api", "nodejs", "jwt"],
                    _ => vec!["prisma", "postgres"],
                };
                Record::Blog(Blog {
                    id,
                    content: format!("{title}. A walk through the details."),
                    title,
                    thumbnail: None,
                    tags: tags.into_iter().map(String::from).collect(),
                    views: 50 + (id * 37) % 450,
                    created_at: format!("2025-09-{:02}", id % 30 + 1),
                    updated_at: None,
                })
            })
            .collect();
        let project_types = [ProjectType::FullStack, ProjectType::Frontend, ProjectType::Backend];
        records.extend((1..=14u64).map(|id| {
            Record::Project(Project {
                id,
                title: format!("Portfolio Project {id}"),
                description: Some(format!("Sample project number {id}.")),
                project_type: project_types[id as usize % 3],
                github_client: Some(format!("https://github.com/example/project-{id}-client")),
                github_server: None,
                live_link: Some(format!("https://project-{id}.example.dev")),
                technologies: vec!["Rust".into(), "PostgreSQL".into(), "Docker".into(), "Redis".into()],
                features: vec!["Authentication".into(), "Dashboard".into(), "Search".into()],
                thumbnail: None,
                views: (id * 53) % 300,
                created_at: format!("2025-08-{:02}T09:30:00Z", id + 1),
                updated_at: None,
            })
        }));
        MemoryStore::new(records)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<Collection, Vec<Record>>>, FolioError> {
        self.records
            .lock()
            .map_err(|_| FolioError::LoadingFailed("record store is poisoned".into()))
    }
}

impl RecordStore for MemoryStore {
    fn list(&self, collection: Collection) -> Result<Vec<Record>, FolioError> {
        Ok(self.lock()?.get(&collection).cloned().unwrap_or_default())
    }

    fn create(&self, draft: &RecordDraft) -> Result<(), FolioError> {
        let mut records = self.lock()?;
        let list = records.entry(draft.collection()).or_default();
        let id = list.iter().map(|r| r.id()).max().unwrap_or(0) + 1;
        list.push(draft.clone().into_record(id));
        Ok(())
    }

    fn update(&self, id: u64, draft: &RecordDraft) -> Result<(), FolioError> {
        let mut records = self.lock()?;
        let record = records
            .get_mut(&draft.collection())
            .and_then(|list| list.iter_mut().find(|r| r.id() == id))
            .ok_or_else(|| not_found(draft.collection(), id))?;
        draft.apply(record);
        Ok(())
    }

    fn delete(&self, collection: Collection, id: u64) -> Result<(), FolioError> {
        let mut records = self.lock()?;
        let list = records.entry(collection).or_default();
        let before = list.len();
        list.retain(|r| r.id() != id);
        if list.len() == before {
            return Err(not_found(collection, id));
        }
        Ok(())
    }

    fn describe(&self) -> String {
        "demo data".to_string()
    }
}

fn not_found(collection: Collection, id: u64) -> FolioError {
    FolioError::Api {
        status: 404,
        message: format!("{} {id} not found", collection.noun()),
    }
}

// -------------------- File snapshot ---------------------- //

#[derive(Debug)]
enum FileType {
    CSV,
    PARQUET,
    ARROW,
}

/// Read-only snapshot of one collection exported to a data file.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    file_type: FileType,
    collection: Collection,
}

impl FileStore {
    pub fn open(path: PathBuf, collection: Collection) -> Result<Self, FolioError> {
        let metadata = fs::metadata(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => FolioError::FileNotFound,
            ErrorKind::PermissionDenied => FolioError::PermissionDenied,
            _ => FolioError::IoError(e),
        })?;
        if !metadata.is_file() {
            return Err(FolioError::LoadingFailed("Not a file!".into()));
        }
        let file_type = Self::detect_file_type(&path)?;
        info!(
            "Opened {:?} snapshot of {} {} ({} bytes)",
            file_type,
            collection.label(),
            path.display(),
            metadata.len()
        );
        Ok(FileStore {
            path,
            file_type,
            collection,
        })
    }

    fn detect_file_type(path: &Path) -> Result<FileType, FolioError> {
        match path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_uppercase())
            .as_deref()
        {
            Some("CSV") => Ok(FileType::CSV),
            Some("PARQUET") | Some("PQ") => Ok(FileType::PARQUET),
            Some("ARROW") | Some("IPC") | Some("FEATHER") => Ok(FileType::ARROW),
            _ => Err(FolioError::UnknownFileType),
        }
    }

    fn load_frame(&self) -> Result<DataFrame, FolioError> {
        let frame = match self.file_type {
            FileType::CSV => LazyCsvReader::new(PlPath::Local(self.path.as_path().into()))
                .with_has_header(true)
                .finish()?,
            FileType::PARQUET => LazyFrame::scan_parquet(
                PlPath::Local(self.path.as_path().into()),
                ScanArgsParquet::default(),
            )?,
            FileType::ARROW => LazyFrame::scan_ipc(
                PlPath::Local(self.path.as_path().into()),
                polars::io::ipc::IpcScanOptions,
                UnifiedScanArgs::default(),
            )?,
        };
        Ok(frame.collect()?)
    }

    // Every column is read as text, one column per rayon task.
    fn load_columns(df: &DataFrame) -> Result<HashMap<String, Vec<String>>, FolioError> {
        let columns: Result<Vec<(String, Vec<String>)>, PolarsError> = df
            .get_column_names()
            .par_iter()
            .map(|name| {
                let col = df.column(name)?.cast(&DataType::String)?;
                let values = col
                    .str()?
                    .into_iter()
                    .map(|v| v.unwrap_or_default().to_string())
                    .collect();
                Ok((name.to_string(), values))
            })
            .collect();
        Ok(columns?.into_iter().collect())
    }

    fn build_records(
        collection: Collection,
        columns: &HashMap<String, Vec<String>>,
        nrows: usize,
    ) -> Result<Vec<Record>, FolioError> {
        let text = |name: &str, row: usize| -> String {
            columns
                .get(name)
                .and_then(|c| c.get(row))
                .cloned()
                .unwrap_or_default()
        };
        let optional = |name: &str, row: usize| -> Option<String> {
            Some(text(name, row)).filter(|v| !v.is_empty())
        };
        for required in ["id", "title"] {
            if !columns.contains_key(required) {
                return Err(FolioError::LoadingFailed(format!("missing column \"{required}\"")));
            }
        }

        (0..nrows)
            .map(|row| {
                let id = text("id", row).parse::<u64>().map_err(|_| {
                    FolioError::LoadingFailed(format!("row {}: invalid id", row + 1))
                })?;
                let views = text("views", row).parse::<u64>().unwrap_or(0);
                let record = match collection {
                    Collection::Blogs => Record::Blog(Blog {
                        id,
                        title: text("title", row),
                        content: text("content", row),
                        thumbnail: optional("thumbnail", row),
                        tags: split_list(&text("tags", row)),
                        views,
                        created_at: text("createdAt", row),
                        updated_at: optional("updatedAt", row),
                    }),
                    Collection::Projects => Record::Project(Project {
                        id,
                        title: text("title", row),
                        description: optional("description", row),
                        project_type: text("projectType", row).parse().map_err(|_| {
                            FolioError::LoadingFailed(format!("row {}: invalid projectType", row + 1))
                        })?,
                        github_client: optional("githubClient", row),
                        github_server: optional("githubServer", row),
                        live_link: optional("liveLink", row).or_else(|| optional("liveSite", row)),
                        technologies: split_list(&text("technologies", row)),
                        features: split_list(&text("features", row)),
                        thumbnail: optional("thumbnail", row),
                        views,
                        created_at: text("createdAt", row),
                        updated_at: optional("updatedAt", row),
                    }),
                };
                Ok(record)
            })
            .collect()
    }
}

impl RecordStore for FileStore {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    fn list(&self, collection: Collection) -> Result<Vec<Record>, FolioError> {
        if !self.serves(collection) {
            return Err(FolioError::LoadingFailed(format!(
                "{} holds {} only",
                self.describe(),
                self.collection.label()
            )));
        }
        let start_time = Instant::now();
        let df = self.load_frame()?;
        let columns = Self::load_columns(&df)?;
        let records = Self::build_records(collection, &columns, df.height())?;
        debug!(
            "Loaded {} {} in {}ms",
            records.len(),
            collection.label(),
            start_time.elapsed().as_millis()
        );
        Ok(records)
    }

    fn create(&self, _draft: &RecordDraft) -> Result<(), FolioError> {
        Err(FolioError::ReadOnly(self.describe()))
    }

    fn update(&self, _id: u64, _draft: &RecordDraft) -> Result<(), FolioError> {
        Err(FolioError::ReadOnly(self.describe()))
    }

    fn delete(&self, _collection: Collection, _id: u64) -> Result<(), FolioError> {
        Err(FolioError::ReadOnly(self.describe()))
    }

    fn serves(&self, collection: Collection) -> bool {
        collection == self.collection
    }

    fn describe(&self) -> String {
        self.path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("???")
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn fixture(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
    }

    fn blog_draft(title: &str) -> RecordDraft {
        RecordDraft::Blog(BlogDraft {
            title: title.to_string(),
            content: "content".to_string(),
            thumbnail: None,
            tags: vec!["rust".to_string()],
        })
    }

    #[test]
    fn memory_store_round_trips_mutations() {
        let store = MemoryStore::new(Vec::new());
        store.create(&blog_draft("First")).unwrap();
        store.create(&blog_draft("Second")).unwrap();

        let blogs = store.list(Collection::Blogs).unwrap();
        assert_eq!(blogs.iter().map(|r| r.id()).collect::<Vec<_>>(), vec![1, 2]);
        assert!(store.list(Collection::Projects).unwrap().is_empty());

        store.update(2, &blog_draft("Second, edited")).unwrap();
        assert_eq!(store.list(Collection::Blogs).unwrap()[1].title(), "Second, edited");

        store.delete(Collection::Blogs, 1).unwrap();
        assert_eq!(store.list(Collection::Blogs).unwrap().len(), 1);
    }

    #[test]
    fn memory_store_reports_missing_records() {
        let store = MemoryStore::new(Vec::new());
        let err = store.delete(Collection::Projects, 9).unwrap_err();
        assert!(matches!(err, FolioError::Api { status: 404, .. }));
        assert!(store.update(9, &blog_draft("x")).is_err());
    }

    #[test]
    fn demo_store_has_both_collections() {
        let store = MemoryStore::demo();
        assert_eq!(store.list(Collection::Blogs).unwrap().len(), 60);
        assert_eq!(store.list(Collection::Projects).unwrap().len(), 14);
    }

    #[test]
    fn drafts_serialize_camel_case() {
        let draft = RecordDraft::Project(ProjectDraft {
            title: "Folio".into(),
            description: "A console".into(),
            project_type: ProjectType::Backend,
            github_client: None,
            github_server: Some("https://github.com/x/y".into()),
            live_site: None,
            technologies: vec!["Rust".into()],
            features: vec!["Tables".into()],
            thumbnail: None,
        });
        let json = serde_json::to_value(&draft).unwrap();
        assert_eq!(json["projectType"], "Backend");
        assert_eq!(json["githubServer"], "https://github.com/x/y");
        assert!(json.get("githubClient").is_none());
    }

    #[test]
    fn file_store_reads_csv_fixture() {
        let store = FileStore::open(fixture("blogs.csv"), Collection::Blogs).unwrap();
        let blogs = store.list(Collection::Blogs).unwrap();
        assert_eq!(blogs.len(), 6);
        match &blogs[0] {
            Record::Blog(b) => {
                assert_eq!(b.id, 1);
                assert_eq!(b.title, "Mastering Next.js App Router");
                assert_eq!(b.tags, vec!["nextjs", "react", "isr"]);
                assert_eq!(b.views, 450);
            }
            other => panic!("expected a blog, got {other:?}"),
        }
        assert_eq!(store.describe(), "blogs.csv");
    }

    #[test]
    fn file_store_serves_one_collection() {
        let store = FileStore::open(fixture("blogs.csv"), Collection::Blogs).unwrap();
        assert!(store.serves(Collection::Blogs));
        assert!(!store.serves(Collection::Projects));
        match store.list(Collection::Projects) {
            Err(FolioError::LoadingFailed(message)) => assert_eq!(message, "blogs.csv holds blogs only"),
            other => panic!("expected a loading error, got {other:?}"),
        }
        assert!(MemoryStore::demo().serves(Collection::Projects));
    }

    #[test]
    fn file_store_is_read_only() {
        let store = FileStore::open(fixture("blogs.csv"), Collection::Blogs).unwrap();
        assert!(matches!(store.create(&blog_draft("x")), Err(FolioError::ReadOnly(_))));
        assert!(matches!(
            store.delete(Collection::Blogs, 1),
            Err(FolioError::ReadOnly(_))
        ));
    }

    #[test]
    fn file_store_reads_projects() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "id,title,projectType,technologies,features,views,createdAt").unwrap();
        writeln!(file, "3,Folio,Backend,\"Rust, Polars\",Tables,12,2025-10-01").unwrap();
        file.flush().unwrap();

        let store = FileStore::open(file.path().to_path_buf(), Collection::Projects).unwrap();
        let projects = store.list(Collection::Projects).unwrap();
        match &projects[0] {
            Record::Project(p) => {
                assert_eq!(p.project_type, ProjectType::Backend);
                assert_eq!(p.technologies, vec!["Rust", "Polars"]);
            }
            other => panic!("expected a project, got {other:?}"),
        }
    }

    #[test]
    fn file_store_rejects_missing_title_column() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "id,views").unwrap();
        writeln!(file, "1,2").unwrap();
        file.flush().unwrap();

        let store = FileStore::open(file.path().to_path_buf(), Collection::Blogs).unwrap();
        assert!(matches!(
            store.list(Collection::Blogs),
            Err(FolioError::LoadingFailed(_))
        ));
    }

    #[test]
    fn open_rejects_unknown_files() {
        assert!(matches!(
            FileStore::open(fixture("missing.csv"), Collection::Blogs),
            Err(FolioError::FileNotFound)
        ));
        let file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        assert!(matches!(
            FileStore::open(file.path().to_path_buf(), Collection::Blogs),
            Err(FolioError::UnknownFileType)
        ));
    }
}
