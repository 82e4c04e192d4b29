/// Element types a generated function can be specialized for
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementType {
    #[default]
    #[serde(rename = "f16")]
    F16,
    #[serde(rename = "bf16")]
    BF16,
    #[serde(rename = "f32")]
    F32,
}

impl ElementType {
    /// Spelling of the element type in generated source
    pub fn cpp_name(self) -> &'static str {
        match self {
            ElementType::F16 => "cutlass::half_t",
            ElementType::BF16 => "cutlass::bfloat16_t",
            ElementType::F32 => "float",
        }
    }

    /// Size of one element, in bytes
    pub fn size_in_bytes(self) -> usize {
        match self {
            ElementType::F16 => 2,
            ElementType::BF16 => 2,
            ElementType::F32 => 4,
        }
    }

    /// Every supported element type, in declaration order
    pub fn all() -> &'static [ElementType] {
        &[
            ElementType::F16,
            ElementType::BF16,
            ElementType::F32,
        ]
    }
}