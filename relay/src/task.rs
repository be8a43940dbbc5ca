//! Client-facing task types and the Notion request bodies built from them.
//!
//! The Notion side uses a fixed database schema:
//!
//! | property      | type      | source field      |
//! |---------------|-----------|-------------------|
//! | `Name`        | title     | `title`           |
//! | `Description` | rich_text | `description`     |
//! | `Parent task` | relation  | `parent_task_id`  |
//! | `Child tasks` | relation  | `child_task_ids`  |
//! | `Task Group`  | relation  | `task_group_id`   |
//! | `Category`    | multi-select, used for filtering only |

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub const NAME_PROPERTY: &str = "Name";
pub const DESCRIPTION_PROPERTY: &str = "Description";
pub const PARENT_TASK_PROPERTY: &str = "Parent task";
pub const CHILD_TASKS_PROPERTY: &str = "Child tasks";
pub const TASK_GROUP_PROPERTY: &str = "Task Group";
pub const CATEGORY_PROPERTY: &str = "Category";

/// Page size of every database query. Only the first page is returned.
pub const LIST_PAGE_SIZE: u32 = 100;

/// Body of `POST /add_task`.
///
/// # Example
/// ```json
/// {
///   "title": "Buy milk",
///   "description": "2 litres",
///   "parent_task_id": "1a2b...",
///   "child_task_ids": ["3c4d...", "5e6f..."],
///   "task_group_id": "7a8b..."
/// }
/// ```
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct CreateTaskRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parent_task_id: Option<String>,
    #[serde(default)]
    pub child_task_ids: Option<Vec<String>>,
    #[serde(default)]
    pub task_group_id: Option<String>,
}

/// Query string of `GET /list_tasks`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ListTasksQuery {
    #[serde(default)]
    pub category: Option<String>,
}

impl ListTasksQuery {
    /// Reads the query from a raw query string such as `category=Work`.
    /// Unknown parameters are ignored; the first `category` wins.
    pub fn from_query_string(query: Option<&str>) -> Self {
        let category = query.and_then(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .find(|(key, _)| key == "category")
                .map(|(_, value)| value.into_owned())
        });

        ListTasksQuery { category }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TextContent {
    pub content: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RichText {
    pub text: TextContent,
}

impl RichText {
    fn plain(content: &str) -> Vec<RichText> {
        vec![RichText {
            text: TextContent {
                content: content.to_string(),
            },
        }]
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PageReference {
    pub id: String,
}

/// A single page property value, serialized with its type as the key,
/// e.g. `{"relation": [{"id": "abc"}]}`.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum PropertyValue {
    Title(Vec<RichText>),
    RichText(Vec<RichText>),
    Relation(Vec<PageReference>),
}

/// Accumulates page properties. Each `with_*` step adds its key only when
/// the value is present and non-empty.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(transparent)]
pub struct Properties(IndexMap<&'static str, PropertyValue>);

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// The title is always written, even when empty.
    pub fn with_title(mut self, name: &'static str, content: &str) -> Self {
        self.0
            .insert(name, PropertyValue::Title(RichText::plain(content)));
        self
    }

    pub fn with_rich_text(mut self, name: &'static str, content: Option<&str>) -> Self {
        if let Some(content) = content.filter(|c| !c.is_empty()) {
            self.0
                .insert(name, PropertyValue::RichText(RichText::plain(content)));
        }
        self
    }

    /// Adds a relation when `ids` yields anything. Ids are passed through
    /// as given, in order.
    pub fn with_relation<'a, I>(mut self, name: &'static str, ids: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let refs: Vec<PageReference> = ids
            .into_iter()
            .map(|id| PageReference { id: id.to_string() })
            .collect();

        if !refs.is_empty() {
            self.0.insert(name, PropertyValue::Relation(refs));
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&CreateTaskRequest> for Properties {
    fn from(task: &CreateTaskRequest) -> Self {
        fn single_id(id: &Option<String>) -> Option<&str> {
            id.as_deref().filter(|id| !id.is_empty())
        }

        let properties = Properties::new()
            .with_title(NAME_PROPERTY, &task.title)
            .with_rich_text(DESCRIPTION_PROPERTY, task.description.as_deref())
            .with_relation(PARENT_TASK_PROPERTY, single_id(&task.parent_task_id))
            .with_relation(
                CHILD_TASKS_PROPERTY,
                task.child_task_ids.iter().flatten().map(String::as_str),
            )
            .with_relation(TASK_GROUP_PROPERTY, single_id(&task.task_group_id));

        debug_assert!(!properties.is_empty(), "title is always present");
        properties
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DatabaseParent {
    pub database_id: String,
}

/// Body of Notion's `POST /pages`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CreatePageBody {
    pub parent: DatabaseParent,
    pub properties: Properties,
}

impl CreatePageBody {
    pub fn for_task(database_id: &str, task: &CreateTaskRequest) -> Self {
        CreatePageBody {
            parent: DatabaseParent {
                database_id: database_id.to_string(),
            },
            properties: Properties::from(task),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Contains {
    pub contains: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MultiSelectFilter {
    pub property: &'static str,
    pub multi_select: Contains,
}

/// Body of Notion's `POST /databases/{id}/query`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DatabaseQueryBody {
    pub page_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<MultiSelectFilter>,
}

impl From<&ListTasksQuery> for DatabaseQueryBody {
    fn from(query: &ListTasksQuery) -> Self {
        let filter = query
            .category
            .as_deref()
            .filter(|c| !c.is_empty())
            .map(|category| MultiSelectFilter {
                property: CATEGORY_PROPERTY,
                multi_select: Contains {
                    contains: category.to_string(),
                },
            });

        DatabaseQueryBody {
            page_size: LIST_PAGE_SIZE,
            filter,
        }
    }
}
