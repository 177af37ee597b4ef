use std::fmt;

/// Which acquisition path produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    NextData,
    Dom,
    Markdown,
}

impl Source {
    pub fn as_str(self) -> &'static str {
        match self {
            Source::NextData => "next-data",
            Source::Dom => "dom",
            Source::Markdown => "markdown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Hackathon,
    NonHackathon,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Hackathon => "hackathon",
            Category::NonHackathon => "non-hackathon",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    pub name: String,
    pub date: Option<String>,
    pub time: Option<String>,
    pub location: Option<String>,
    pub url: String,
    pub image_url: Option<String>,
    pub category: Option<Category>,
    pub source: Source,
}

impl EventRecord {
    pub fn new(name: impl Into<String>, url: impl Into<String>, source: Source) -> Self {
        Self {
            name: name.into(),
            date: None,
            time: None,
            location: None,
            url: url.into(),
            image_url: None,
            category: None,
            source,
        }
    }

    /// URL with the query string removed.
    pub fn dedup_key(&self) -> &str {
        self.url.split('?').next().unwrap_or("")
    }
}

impl fmt::Display for EventRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "📅 {}", self.name)?;
        if let Some(date) = &self.date {
            write!(f, "\n   Date: {}", date)?;
        }
        if let Some(time) = &self.time {
            write!(f, "\n   Time: {}", time)?;
        }
        if let Some(location) = &self.location {
            write!(f, "\n   Location: {}", location)?;
        }
        if let Some(category) = self.category {
            write!(f, "\n   Category: {}", category.as_str())?;
        }
        if let Some(image) = &self.image_url {
            write!(f, "\n   Image: {}", image)?;
        }
        write!(f, "\n   URL: {}", self.url)?;
        write!(f, "\n   Source: {}", self.source.as_str())
    }
}
