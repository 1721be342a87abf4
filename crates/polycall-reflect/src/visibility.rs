/// Visibility of an Attribute/Method/Constructor.
///
/// Named but left as a bare field in the data model ("Attribute: name,
/// Type, visibility"); given the three-level enum the teacher uses for its
/// own class members (`entries/common.rs`'s `PropertyEntry`/`FieldEntry`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    Private,
}

impl std::fmt::Display for Visibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Visibility::Public => "public",
            Visibility::Protected => "protected",
            Visibility::Private => "private",
        };
        f.write_str(s)
    }
}
