//! The uniform statement tree shared by both input syntaxes.
//!
//! Every YANG construct reduces to `keyword [argument] (";" | "{" … "}")`;
//! YIN maps the same constructs onto XML elements. Both readers in this crate
//! produce the tree below, and schema semantics (cardinality, scoping,
//! resolution) are layered on top by a compiler.

use std::fmt;

/// One parsed statement: a keyword, an optional argument and nested
/// substatements, in source order.
#[derive(Clone, PartialEq, Eq)]
pub struct Statement {
    pub keyword: Keyword,
    pub arg: Option<String>,
    pub children: Vec<Statement>,
    /// Byte offset of the keyword within the input.
    pub loc: usize,
}

impl Statement {
    pub fn new(keyword: Keyword, arg: Option<String>, loc: usize) -> Self {
        Self {
            keyword,
            arg,
            children: Vec::new(),
            loc,
        }
    }

    /// The statement's argument, or `""` when it has none.
    pub fn arg_str(&self) -> &str {
        self.arg.as_deref().unwrap_or_default()
    }

    /// First child with the given keyword.
    pub fn child(&self, keyword: &Keyword) -> Option<&Statement> {
        self.children.iter().find(|c| &c.keyword == keyword)
    }

    /// All children with the given keyword, in source order.
    pub fn children_of<'a>(
        &'a self,
        keyword: &'a Keyword,
    ) -> impl Iterator<Item = &'a Statement> + 'a {
        self.children.iter().filter(move |c| &c.keyword == keyword)
    }
}

impl fmt::Debug for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.keyword.as_str())?;
        if let Some(arg) = &self.arg {
            write!(f, " {arg:?}")?;
        }
        if self.children.is_empty() {
            write!(f, ";")
        } else {
            f.debug_list().entries(&self.children).finish()
        }
    }
}

/// A parsed document: the top-level statement chain. A well-formed schema
/// file holds exactly one `module` or `submodule` statement.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Document {
    pub statements: Vec<Statement>,
}

macro_rules! keywords {
    ($($variant:ident => $text:literal,)*) => {
        /// All RFC 6020 statement keywords, plus `Unknown` for extension
        /// statements (`prefix:name`), which are carried through unparsed.
        #[derive(Clone, Debug, PartialEq, Eq, Hash)]
        pub enum Keyword {
            $($variant,)*
            Unknown(String),
        }

        impl Keyword {
            pub fn from_word(word: &str) -> Self {
                match word {
                    $($text => Keyword::$variant,)*
                    other => Keyword::Unknown(other.to_string()),
                }
            }

            pub fn as_str(&self) -> &str {
                match self {
                    $(Keyword::$variant => $text,)*
                    Keyword::Unknown(name) => name,
                }
            }
        }
    };
}

keywords! {
    Anyxml => "anyxml",
    Argument => "argument",
    Augment => "augment",
    Base => "base",
    BelongsTo => "belongs-to",
    Bit => "bit",
    Case => "case",
    Choice => "choice",
    Config => "config",
    Contact => "contact",
    Container => "container",
    Default => "default",
    Description => "description",
    Deviate => "deviate",
    Deviation => "deviation",
    Enum => "enum",
    ErrorAppTag => "error-app-tag",
    ErrorMessage => "error-message",
    Extension => "extension",
    Feature => "feature",
    FractionDigits => "fraction-digits",
    Grouping => "grouping",
    Identity => "identity",
    IfFeature => "if-feature",
    Import => "import",
    Include => "include",
    Input => "input",
    Key => "key",
    Leaf => "leaf",
    LeafList => "leaf-list",
    Length => "length",
    List => "list",
    Mandatory => "mandatory",
    MaxElements => "max-elements",
    MinElements => "min-elements",
    Module => "module",
    Must => "must",
    Namespace => "namespace",
    Notification => "notification",
    OrderedBy => "ordered-by",
    Organization => "organization",
    Output => "output",
    Path => "path",
    Pattern => "pattern",
    Position => "position",
    Prefix => "prefix",
    Presence => "presence",
    Range => "range",
    Reference => "reference",
    Refine => "refine",
    RequireInstance => "require-instance",
    Revision => "revision",
    RevisionDate => "revision-date",
    Rpc => "rpc",
    Status => "status",
    Submodule => "submodule",
    Type => "type",
    Typedef => "typedef",
    Unique => "unique",
    Units => "units",
    Uses => "uses",
    Value => "value",
    When => "when",
    YangVersion => "yang-version",
    YinElement => "yin-element",
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
