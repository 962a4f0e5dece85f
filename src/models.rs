use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Server-assigned post identifier (`_id` on the wire).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(pub String);

impl PostId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "UserRecord")]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
}

/// User as the server sends it. Document stores may send `_id`, `id`, or both.
#[derive(Deserialize)]
struct UserRecord {
    #[serde(default)]
    id: Option<String>,
    #[serde(default, rename = "_id")]
    object_id: Option<String>,
    #[serde(default)]
    email: String,
    #[serde(default)]
    name: String,
}

impl From<UserRecord> for User {
    fn from(record: UserRecord) -> Self {
        let id = record
            .id
            .filter(|id| !id.is_empty())
            .or(record.object_id)
            .unwrap_or_default();
        User {
            id,
            email: record.email,
            name: record.name,
        }
    }
}

impl User {
    /// Label shown next to the post form: name, then email, then "you".
    pub fn display_name(&self) -> &str {
        if !self.name.is_empty() {
            &self.name
        } else if !self.email.is_empty() {
            &self.email
        } else {
            "you"
        }
    }
}

/// Who created a post. Older posts only carry a free-text creator string.
/// When a record has an id but no email, that string stands in for the email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Creator {
    ById { id: String, email: Option<String> },
    ByEmail(String),
    Legacy(String),
}

impl Creator {
    pub fn is_owned_by(&self, user: &User) -> bool {
        match self {
            Creator::ById { id, email } => {
                (!id.is_empty() && *id == user.id)
                    || email.as_deref().is_some_and(|e| same_email(e, user))
            }
            Creator::ByEmail(email) | Creator::Legacy(email) => same_email(email, user),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Creator::ById { id, email } => email.as_deref().unwrap_or(id),
            Creator::ByEmail(email) => email,
            Creator::Legacy(name) => name,
        }
    }
}

fn same_email(email: &str, user: &User) -> bool {
    !user.email.is_empty() && email == user.email
}

/// Image attached to a post. `Inline` holds a data URL and is only used
/// before (or instead of) a third-party upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageRef {
    Remote {
        url: String,
        public_id: Option<String>,
    },
    Inline(String),
}

impl ImageRef {
    fn from_wire(selected_file: Option<String>, public_id: Option<String>) -> Option<Self> {
        let value = selected_file.filter(|s| !s.is_empty())?;
        if value.starts_with("data:") {
            Some(ImageRef::Inline(value))
        } else {
            Some(ImageRef::Remote {
                url: value,
                public_id,
            })
        }
    }

    pub fn src(&self) -> &str {
        match self {
            ImageRef::Remote { url, .. } => url,
            ImageRef::Inline(data) => data,
        }
    }

    pub fn public_id(&self) -> Option<&str> {
        match self {
            ImageRef::Remote { public_id, .. } => public_id.as_deref(),
            ImageRef::Inline(_) => None,
        }
    }
}

/// Tags as typed in the form (comma-separated) or as received from the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Tags {
    List(Vec<String>),
    Raw(String),
}

impl Default for Tags {
    fn default() -> Self {
        Tags::Raw(String::new())
    }
}

impl Tags {
    /// Split a raw value on commas, trimming and dropping empty segments.
    /// A list is returned as-is.
    pub fn normalize(&self) -> Vec<String> {
        match self {
            Tags::List(tags) => tags.clone(),
            Tags::Raw(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|tag| !tag.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Tags::List(tags) => tags.is_empty(),
            Tags::Raw(raw) => raw.trim().is_empty(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    pub id: PostId,
    pub title: String,
    pub message: String,
    pub tags: Vec<String>,
    pub creator: Option<Creator>,
    pub image: Option<ImageRef>,
    pub like_count: u64,
    pub created_at: Option<DateTime<Utc>>,
}

impl Post {
    pub fn is_owned_by(&self, user: &User) -> bool {
        self.creator.as_ref().is_some_and(|c| c.is_owned_by(user))
    }
}

/// Post as it travels over the wire.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PostRecord {
    #[serde(rename = "_id")]
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    tags: Option<Tags>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    creator_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    creator_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    creator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    selected_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    image_public_id: Option<String>,
    #[serde(default, rename = "likecount")]
    like_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    created_at: Option<DateTime<Utc>>,
}

impl From<PostRecord> for Post {
    fn from(record: PostRecord) -> Self {
        let non_empty = |v: Option<String>| v.filter(|s| !s.is_empty());
        let creator_email = non_empty(record.creator_email);
        let creator = match (
            non_empty(record.creator_id),
            creator_email,
            non_empty(record.creator),
        ) {
            (Some(id), email, legacy) => Some(Creator::ById {
                id,
                email: email.or(legacy),
            }),
            (None, Some(email), _) => Some(Creator::ByEmail(email)),
            (None, None, Some(legacy)) => Some(Creator::Legacy(legacy)),
            (None, None, None) => None,
        };

        Post {
            id: PostId(record.id),
            title: record.title,
            message: record.message,
            tags: record.tags.map(|t| t.normalize()).unwrap_or_default(),
            creator,
            image: ImageRef::from_wire(record.selected_file, record.image_public_id),
            like_count: record.like_count,
            created_at: record.created_at,
        }
    }
}

impl From<&Post> for PostRecord {
    fn from(post: &Post) -> Self {
        let mut record = PostRecord {
            id: post.id.0.clone(),
            title: post.title.clone(),
            message: post.message.clone(),
            tags: Some(Tags::List(post.tags.clone())),
            like_count: post.like_count,
            created_at: post.created_at,
            ..Default::default()
        };
        match &post.creator {
            Some(Creator::ById { id, email }) => {
                record.creator_id = Some(id.clone());
                record.creator_email = email.clone();
            }
            Some(Creator::ByEmail(email)) => record.creator_email = Some(email.clone()),
            Some(Creator::Legacy(name)) => record.creator = Some(name.clone()),
            None => {}
        }
        if let Some(image) = &post.image {
            record.selected_file = Some(image.src().to_string());
            record.image_public_id = image.public_id().map(str::to_string);
        }
        record
    }
}

impl<'de> Deserialize<'de> for Post {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        PostRecord::deserialize(deserializer).map(Post::from)
    }
}

impl Serialize for Post {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        PostRecord::from(self).serialize(serializer)
    }
}

/// In-progress field values for a post being created or edited.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostDraft {
    pub title: String,
    pub message: String,
    pub tags: Tags,
    pub image: Option<ImageRef>,
}

impl PostDraft {
    pub fn is_blank(&self) -> bool {
        self.title.is_empty() && self.message.is_empty() && self.tags.is_empty() && self.image.is_none()
    }

    /// Body sent on create/update. Tags are always a list here.
    pub fn payload(&self) -> DraftPayload {
        DraftPayload {
            title: self.title.clone(),
            message: self.message.clone(),
            tags: self.tags.normalize(),
            selected_file: self
                .image
                .as_ref()
                .map(|i| i.src().to_string())
                .unwrap_or_default(),
            image_public_id: self
                .image
                .as_ref()
                .and_then(|i| i.public_id())
                .map(str::to_string),
        }
    }
}

impl From<&Post> for PostDraft {
    fn from(post: &Post) -> Self {
        Self {
            title: post.title.clone(),
            message: post.message.clone(),
            tags: Tags::List(post.tags.clone()),
            image: post.image.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftPayload {
    pub title: String,
    pub message: String,
    pub tags: Vec<String>,
    pub selected_file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_public_id: Option<String>,
}

/// Resolved identity plus the optional bearer credential issued at sign-in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub user: User,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

/// One-time credential for a direct upload to the asset host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSignature {
    pub cloud_name: String,
    pub api_key: String,
    pub timestamp: i64,
    pub signature: String,
}

/// Successful response from the asset host.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UploadedAsset {
    pub secure_url: String,
    pub public_id: String,
}
