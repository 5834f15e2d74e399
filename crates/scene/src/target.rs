/// The element a map paints into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomTarget {
    id: String,
    attached: bool,
    size: [u32; 2],
}

impl DomTarget {
    pub fn new(id: impl Into<String>, size: [u32; 2]) -> Self {
        Self {
            id: id.into(),
            attached: true,
            size,
        }
    }

    /// A target whose element has not been created yet.
    pub fn detached(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attached: false,
            size: [0, 0],
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn size(&self) -> [u32; 2] {
        self.size
    }
}
