//! Size and shape of memory operands.

/// Describes what a memory operand reads or writes.
///
/// Besides the number of bytes accessed this also says how the bytes are
/// interpreted: as a scalar, as a packed vector of elements, or as a single
/// element that is broadcast to every lane of a vector register.
///
/// The variant names follow the `<shape><bits>_<element>` scheme common among
/// x86 decoders (eg. `Packed128_Int8` is 16 signed bytes).
#[allow(non_camel_case_types)]
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone)]
pub enum MemorySize {
    /// The instruction has no memory operand.
    Unknown,

    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Int32,
    Int64,
    Float32,
    Float64,

    Packed64_Int8,
    Packed64_Int16,
    Packed64_Int32,
    Packed64_Int64,

    Packed128_UInt8,
    Packed128_Int8,
    Packed128_Int16,
    Packed128_Int32,
    Packed128_Int64,
    Packed128_Float32,
    Packed128_Float64,

    Packed256_Int8,
    Packed256_Int16,
    Packed256_Int32,
    Packed256_Int64,
    Packed256_Float32,
    Packed256_Float64,

    Packed512_Int8,
    Packed512_Int16,
    Packed512_Int32,
    Packed512_Int64,
    Packed512_Float32,
    Packed512_Float64,

    Broadcast128_Int32,
    Broadcast128_Int64,
    Broadcast128_Float32,
    Broadcast128_Float64,
    Broadcast256_Int32,
    Broadcast256_Int64,
    Broadcast256_Float32,
    Broadcast256_Float64,
    Broadcast512_Int32,
    Broadcast512_Int64,
    Broadcast512_Float32,
    Broadcast512_Float64,
}

impl Default for MemorySize {
    fn default() -> Self {
        MemorySize::Unknown
    }
}

impl MemorySize {
    /// Number of bytes actually loaded from or stored to memory.
    ///
    /// For broadcasts this is the size of the single element read, not the
    /// width of the vector it is replicated into.
    pub fn size(&self) -> usize {
        use self::MemorySize::*;

        match self {
            Unknown => 0,
            UInt8 => 1,
            UInt16 => 2,
            UInt32 | Int32 | Float32 => 4,
            UInt64 | Int64 | Float64 => 8,
            Packed64_Int8 | Packed64_Int16 | Packed64_Int32 | Packed64_Int64 => 8,
            Packed128_UInt8 | Packed128_Int8 | Packed128_Int16 | Packed128_Int32 |
            Packed128_Int64 | Packed128_Float32 | Packed128_Float64 => 16,
            Packed256_Int8 | Packed256_Int16 | Packed256_Int32 | Packed256_Int64 |
            Packed256_Float32 | Packed256_Float64 => 32,
            Packed512_Int8 | Packed512_Int16 | Packed512_Int32 | Packed512_Int64 |
            Packed512_Float32 | Packed512_Float64 => 64,
            _ => self.element_size(),
        }
    }

    /// Size in bytes of one element.
    ///
    /// Scalars are their own element.
    pub fn element_size(&self) -> usize {
        use self::MemorySize::*;

        match self {
            Unknown => 0,
            UInt8 | Packed64_Int8 | Packed128_UInt8 | Packed128_Int8 | Packed256_Int8 |
            Packed512_Int8 => 1,
            UInt16 | Packed64_Int16 | Packed128_Int16 | Packed256_Int16 | Packed512_Int16 => 2,
            UInt32 | Int32 | Float32 | Packed64_Int32 | Packed128_Int32 | Packed128_Float32 |
            Packed256_Int32 | Packed256_Float32 | Packed512_Int32 | Packed512_Float32 |
            Broadcast128_Int32 | Broadcast128_Float32 | Broadcast256_Int32 |
            Broadcast256_Float32 | Broadcast512_Int32 | Broadcast512_Float32 => 4,
            UInt64 | Int64 | Float64 | Packed64_Int64 | Packed128_Int64 | Packed128_Float64 |
            Packed256_Int64 | Packed256_Float64 | Packed512_Int64 | Packed512_Float64 |
            Broadcast128_Int64 | Broadcast128_Float64 | Broadcast256_Int64 |
            Broadcast256_Float64 | Broadcast512_Int64 | Broadcast512_Float64 => 8,
        }
    }

    /// Whether a single element is broadcast to all vector lanes.
    pub fn is_broadcast(&self) -> bool {
        use self::MemorySize::*;

        match self {
            Broadcast128_Int32 | Broadcast128_Int64 | Broadcast128_Float32 |
            Broadcast128_Float64 | Broadcast256_Int32 | Broadcast256_Int64 |
            Broadcast256_Float32 | Broadcast256_Float64 | Broadcast512_Int32 |
            Broadcast512_Int64 | Broadcast512_Float32 | Broadcast512_Float64 => true,
            _ => false,
        }
    }

    /// Number of vector lanes the operand covers.
    ///
    /// For packed operands this is the number of elements in memory, for
    /// broadcasts the number of lanes the element is copied to. Scalars have a
    /// single lane.
    pub fn lanes(&self) -> usize {
        use self::MemorySize::*;

        let width = match self {
            Unknown => return 0,
            Broadcast128_Int32 | Broadcast128_Int64 | Broadcast128_Float32 |
            Broadcast128_Float64 => 16,
            Broadcast256_Int32 | Broadcast256_Int64 | Broadcast256_Float32 |
            Broadcast256_Float64 => 32,
            Broadcast512_Int32 | Broadcast512_Int64 | Broadcast512_Float32 |
            Broadcast512_Float64 => 64,
            _ => self.size(),
        };
        width / self.element_size()
    }

    /// Whether the memory holds more than one element.
    pub fn is_packed(&self) -> bool {
        !self.is_broadcast() && self.size() > self.element_size()
    }
}
