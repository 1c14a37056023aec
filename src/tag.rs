/// A resource tag.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Tag {
    /// The tag key.
    pub key: String,

    /// The tag value.
    pub value: String,
}
