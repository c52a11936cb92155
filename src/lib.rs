//! # dexview
//!
//! A zero-copy reader for Android dex files. The file is validated once when
//! opened; after that every id record, string, type list and class member is
//! decoded straight out of the borrowed buffer on demand.
//!
//! # Examples
//!
//! ```no_run
//!  use dexview::DexFile;
//!
//!  let bytes = std::fs::read("classes.dex").unwrap();
//!  let dex = DexFile::open(&bytes).unwrap();
//!  for class_def in dex.class_defs().iter() {
//!      println!("{}", dex.class_descriptor(&class_def).unwrap());
//!  }
//!  let object = dex.find_type_by_descriptor("Ljava/lang/Object;");
//!  println!("Object is type {:?}", object);
//! ```

pub mod dex;

#[cfg(test)]
mod tests;

pub use dex::{
    AccessFlags, ClassDataIterator, ClassDefItem, ClassMember, DexError, DexErrorKind, DexFile, DexOptions, DexStr,
    Header, TypeList, NO_INDEX,
};
