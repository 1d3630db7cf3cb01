//! Cell language tags.
//!
//! The language set is open: structured formats and the known code dialects
//! get validators, while anything else is carried verbatim as `Other` and
//! routed to the not-validated path. An unrecognized language never rejects
//! a write.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Language tag on a cell. Known tags dispatch to a validator; `Other`
/// stores the client's string untouched (lowercased) and is never validated.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CellLanguage {
    Json,
    Yaml,
    Yml,
    Md,
    Txt,
    Py,
    Js,
    Ts,
    Tsx,
    Jsx,
    Rs,
    C,
    H,
    Cpp,
    Hpp,
    Sh,
    Css,
    Html,
    Htm,
    Java,
    Go,
    Rb,
    Toml,
    Php,
    Cs,
    Other(String),
}

impl CellLanguage {
    /// Resolve a language string. Matching is case-insensitive; anything
    /// outside the known set becomes `Other`.
    pub fn from_name(name: &str) -> Self {
        let lowered = name.trim().to_ascii_lowercase();
        match lowered.as_str() {
            "json" => CellLanguage::Json,
            "yaml" => CellLanguage::Yaml,
            "yml" => CellLanguage::Yml,
            "md" => CellLanguage::Md,
            "txt" => CellLanguage::Txt,
            "py" => CellLanguage::Py,
            "js" => CellLanguage::Js,
            "ts" => CellLanguage::Ts,
            "tsx" => CellLanguage::Tsx,
            "jsx" => CellLanguage::Jsx,
            "rs" => CellLanguage::Rs,
            "c" => CellLanguage::C,
            "h" => CellLanguage::H,
            "cpp" => CellLanguage::Cpp,
            "hpp" => CellLanguage::Hpp,
            "sh" => CellLanguage::Sh,
            "css" => CellLanguage::Css,
            "html" => CellLanguage::Html,
            "htm" => CellLanguage::Htm,
            "java" => CellLanguage::Java,
            "go" => CellLanguage::Go,
            "rb" => CellLanguage::Rb,
            "toml" => CellLanguage::Toml,
            "php" => CellLanguage::Php,
            "cs" => CellLanguage::Cs,
            _ => CellLanguage::Other(lowered),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            CellLanguage::Json => "json",
            CellLanguage::Yaml => "yaml",
            CellLanguage::Yml => "yml",
            CellLanguage::Md => "md",
            CellLanguage::Txt => "txt",
            CellLanguage::Py => "py",
            CellLanguage::Js => "js",
            CellLanguage::Ts => "ts",
            CellLanguage::Tsx => "tsx",
            CellLanguage::Jsx => "jsx",
            CellLanguage::Rs => "rs",
            CellLanguage::C => "c",
            CellLanguage::H => "h",
            CellLanguage::Cpp => "cpp",
            CellLanguage::Hpp => "hpp",
            CellLanguage::Sh => "sh",
            CellLanguage::Css => "css",
            CellLanguage::Html => "html",
            CellLanguage::Htm => "htm",
            CellLanguage::Java => "java",
            CellLanguage::Go => "go",
            CellLanguage::Rb => "rb",
            CellLanguage::Toml => "toml",
            CellLanguage::Php => "php",
            CellLanguage::Cs => "cs",
            CellLanguage::Other(name) => name,
        }
    }

    /// True for dialects validated through the external syntax checker.
    /// `Other` is not code: it skips validation entirely.
    pub fn is_code(&self) -> bool {
        !matches!(
            self,
            CellLanguage::Json
                | CellLanguage::Yaml
                | CellLanguage::Yml
                | CellLanguage::Md
                | CellLanguage::Txt
                | CellLanguage::Other(_)
        )
    }

    /// The known language names, in declaration order.
    pub fn all() -> &'static [&'static str] {
        &[
            "json", "yaml", "yml", "md", "txt", "py", "js", "ts", "tsx", "jsx", "rs", "c", "h",
            "cpp", "hpp", "sh", "css", "html", "htm", "java", "go", "rb", "toml", "php", "cs",
        ]
    }
}

impl std::str::FromStr for CellLanguage {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_name(s))
    }
}

impl std::fmt::Display for CellLanguage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for CellLanguage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for CellLanguage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(CellLanguage::from_name(&name))
    }
}
