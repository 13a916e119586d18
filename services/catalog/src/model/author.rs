//! Author entity and its joined record.
use crate::model::Book;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Author {
    pub id: i64,
    pub names: String,
    pub last_names: String,
    pub identification: Option<String>,
    pub picture: Option<String>,
}

impl Author {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.names, self.last_names)
    }

    pub fn apply(&mut self, draft: AuthorDraft) {
        self.names = draft.names;
        self.last_names = draft.last_names;
        self.identification = draft.identification;
        self.picture = draft.picture;
    }
}

/// Author fields supplied on create and full update; the store assigns `id`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct AuthorDraft {
    pub names: String,
    pub last_names: String,
    pub identification: Option<String>,
    pub picture: Option<String>,
}

impl From<&Author> for AuthorDraft {
    fn from(author: &Author) -> Self {
        Self {
            names: author.names.clone(),
            last_names: author.last_names.clone(),
            identification: author.identification.clone(),
            picture: author.picture.clone(),
        }
    }
}

/// Author joined with the books it is credited on.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct AuthorRecord {
    pub author: Author,
    pub books: Vec<Book>,
}
