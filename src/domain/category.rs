use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Closed set of source classifications used for filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Tech,
    Academic,
    General,
    Dev,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Tech,
        Category::Academic,
        Category::General,
        Category::Dev,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Tech => "tech",
            Category::Academic => "academic",
            Category::General => "general",
            Category::Dev => "dev",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::Tech => "Technology",
            Category::Academic => "Academic",
            Category::General => "General",
            Category::Dev => "Developers",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Category::Tech => "icon-desktop",
            Category::Academic => "icon-graduation-cap",
            Category::General => "icon-fire",
            Category::Dev => "icon-code",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            Category::Tech => "#3498db",
            Category::Academic => "#9b59b6",
            Category::General => "#e74c3c",
            Category::Dev => "#2ecc71",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tech" => Ok(Category::Tech),
            "academic" => Ok(Category::Academic),
            "general" => Ok(Category::General),
            "dev" => Ok(Category::Dev),
            other => Err(format!(
                "Unknown category: {}. Expected one of tech, academic, general, dev",
                other
            )),
        }
    }
}

/// Category selector: one category, or every category.
///
/// Doubles as the cache key selector; `All` maps to the `"all"` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(Category),
}

impl CategoryFilter {
    pub fn matches(&self, category: Category) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(c) => *c == category,
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            CategoryFilter::All => "all",
            CategoryFilter::Only(c) => c.as_str(),
        }
    }
}

impl From<Option<Category>> for CategoryFilter {
    fn from(category: Option<Category>) -> Self {
        category.map_or(CategoryFilter::All, CategoryFilter::Only)
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}
