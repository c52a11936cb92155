use bitflags::bitflags;

// Access flags as stored in class_def_item, encoded_field and encoded_method.
// Several bits mean different things depending on where they appear.
bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AccessFlags: u32 {
        const PUBLIC = 0x1;
        const PRIVATE = 0x2;
        const PROTECTED = 0x4;
        const STATIC = 0x8;
        const FINAL = 0x10;
        const SYNCHRONIZED = 0x20;
        const VOLATILE = 0x40;
        const BRIDGE = 0x40;
        const TRANSIENT = 0x80;
        const VARARGS = 0x80;
        const NATIVE = 0x100;
        const INTERFACE = 0x200;
        const ABSTRACT = 0x400;
        const STRICT = 0x800;
        const SYNTHETIC = 0x1000;
        const ANNOTATION = 0x2000;
        const ENUM = 0x4000;
        const CONSTRUCTOR = 0x10000;
        const DECLARED_SYNCHRONIZED = 0x20000;
    }
}

impl AccessFlags
{
    /// Keeps bits the format may define later instead of dropping them.
    pub fn from_raw(bits: u32) -> Self
    {
        AccessFlags::from_bits_retain(bits)
    }

    /// Methods with no code item: the code offset must be zero for these.
    pub fn is_code_less(&self) -> bool
    {
        self.intersects(AccessFlags::ABSTRACT | AccessFlags::NATIVE)
    }
}
