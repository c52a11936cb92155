use std::cmp::Ordering;

use crate::dex::{AccessFlags, ClassDataState, ClassMember, DexFile};
use crate::tests::fixture::{nested_dex, DexFixture, FixtureClass};

fn create_method_signature_dex() -> Vec<u8> {
    DexFixture::new()
        .class(
            FixtureClass::new("LCreateMethodSignature;")
                .source_file("CreateMethodSignature.java")
                .constructor()
                .virtual_method("m1", "(IDJLjava/lang/Object;)Ljava/lang/Float;", AccessFlags::empty())
                .virtual_method("m2", "(ZSC)LCreateMethodSignature;", AccessFlags::empty()),
        )
        .method_ref("Ljava/lang/Object;", "<init>", "()V")
        .build()
}

/// Several classes with fields, overloads, arrays, interfaces and non-ASCII
/// strings, so every table has more than a handful of entries.
fn library_dex() -> Vec<u8> {
    let static_native = AccessFlags::PUBLIC | AccessFlags::STATIC | AccessFlags::NATIVE;
    DexFixture::new()
        .class(
            FixtureClass::new("Lcom/example/Shape;")
                .superclass(Some("Ljava/lang/Object;"))
                .interface("Ljava/lang/Comparable;")
                .source_file("Shape.java")
                .static_field("COUNT", "I")
                .static_field("NAMES", "[Ljava/lang/String;")
                .instance_field("area", "D")
                .instance_field("label", "Ljava/lang/String;")
                .constructor()
                .direct_method("<init>", "(D)V", AccessFlags::PUBLIC | AccessFlags::CONSTRUCTOR)
                .direct_method("helper", "(JJ)J", AccessFlags::PRIVATE | AccessFlags::STATIC)
                .virtual_method("area", "()D", AccessFlags::PUBLIC)
                .virtual_method("compareTo", "(Ljava/lang/Object;)I", AccessFlags::PUBLIC)
                .virtual_method("scale", "(D)Lcom/example/Shape;", AccessFlags::PUBLIC | AccessFlags::ABSTRACT),
        )
        .class(
            FixtureClass::new("Lcom/example/Circle;")
                .superclass(Some("Lcom/example/Shape;"))
                .source_file("Circle.java")
                .instance_field("radius", "D")
                .direct_method("<init>", "(D)V", AccessFlags::PUBLIC | AccessFlags::CONSTRUCTOR)
                .direct_method("nativeArea", "([DI)D", static_native)
                .virtual_method("area", "()D", AccessFlags::PUBLIC)
                .virtual_method("scale", "(D)Lcom/example/Shape;", AccessFlags::PUBLIC),
        )
        .class(FixtureClass::new("Lcom/example/Empty;").superclass(None))
        .method_ref("Ljava/lang/Object;", "<init>", "()V")
        .method_ref("Ljava/lang/Math;", "sqrt", "(D)D")
        .method_ref("Ljava/lang/String;", "valueOf", "(C)Ljava/lang/String;")
        .field_ref("Ljava/lang/System;", "out", "Ljava/io/PrintStream;")
        .string("")
        .string("caf\u{e9}")
        .string("\u{e000}private use")
        .string("\u{1f600} grin")
        .string("nul\u{0}inside")
        .build()
}

#[test]
fn create_method_signature() {
    let bytes = create_method_signature_dex();
    let dex = DexFile::open(&bytes).unwrap();

    let class_idx = dex.find_class_def("LCreateMethodSignature;").unwrap();
    let class_def = dex.class_def(class_idx).unwrap();
    assert_eq!(dex.class_descriptor(&class_def).unwrap(), "LCreateMethodSignature;");

    let mut it = dex.class_data(&class_def).unwrap();
    assert_eq!(it.num_static_fields(), 0);
    assert_eq!(it.num_instance_fields(), 0);
    assert_eq!(it.num_direct_methods(), 1);
    assert_eq!(it.num_virtual_methods(), 2);

    let ctor = it.advance().unwrap();
    assert!(matches!(ctor, ClassMember::DirectMethod(_)));
    let method = dex.method_id(ctor.index()).unwrap();
    assert_eq!(dex.string_at(method.name_idx).unwrap(), "<init>");
    assert_eq!(dex.method_signature(method.proto_idx).unwrap(), "()V");

    let expected = [
        ("m1", "(IDJLjava/lang/Object;)Ljava/lang/Float;"),
        ("m2", "(ZSC)LCreateMethodSignature;"),
    ];
    for (name, signature) in expected {
        assert_eq!(it.state(), ClassDataState::VirtualMethods);
        let member = it.advance().unwrap();
        let method = dex.method_id(member.index()).unwrap();
        assert_eq!(dex.string_at(method.name_idx).unwrap(), name);
        assert_eq!(dex.method_signature(method.proto_idx).unwrap(), signature);
        assert!(member.code_off().is_some());
    }
    assert!(!it.has_next());

    let m1 = dex.find_string_id("m1").unwrap();
    let proto = dex.find_proto_by_signature("(IDJLjava/lang/Object;)Ljava/lang/Float;").unwrap();
    let class_type = dex.find_type_by_descriptor("LCreateMethodSignature;").unwrap();
    let found = dex.find_method_id(class_type, m1, proto).unwrap();
    assert_eq!(dex.method_descriptor(found).unwrap(), "LCreateMethodSignature;->m1(IDJLjava/lang/Object;)Ljava/lang/Float;");
    assert_eq!(dex.proto_shorty(proto).unwrap(), "LIDJL");
}

#[test]
fn find_string_id() {
    let bytes = create_method_signature_dex();
    let dex = DexFile::open(&bytes).unwrap();
    let strings = ["LCreateMethodSignature;", "Ljava/lang/Float;", "Ljava/lang/Object;", "D", "I", "J"];
    for s in strings {
        let idx = dex.find_string_id(s).unwrap_or_else(|| panic!("{} not found", s));
        assert_eq!(dex.string_at(idx).unwrap(), s);
    }
    assert_eq!(dex.find_string_id("Ljava/lang/Double;"), None);
    assert_eq!(dex.find_string_id("E"), None);
}

#[test]
fn tables_are_in_canonical_order() {
    let bytes = library_dex();
    let dex = DexFile::open(&bytes).unwrap();

    let strings: Vec<_> = (0..dex.string_ids().len()).map(|i| dex.string_at(i).unwrap()).collect();
    for pair in strings.windows(2) {
        assert_eq!(pair[0].cmp_utf16(&pair[1]), Ordering::Less, "{} / {}", pair[0], pair[1]);
    }
    // UTF-16 order puts the surrogate pair before the private use character.
    let grin = dex.find_string_id("\u{1f600} grin").unwrap();
    let private = dex.find_string_id("\u{e000}private use").unwrap();
    assert!(grin < private);
    assert_eq!(dex.find_string_id(""), Some(0));
}

#[test]
fn lookups_round_trip() {
    let bytes = library_dex();
    let dex = DexFile::open(&bytes).unwrap();

    for i in 0..dex.string_ids().len() {
        let s = dex.string_at(i).unwrap();
        assert_eq!(dex.find_string_id_mutf8(s.as_bytes()), Some(i), "string {:?}", s);
        assert_eq!(dex.find_string_id(&s.to_str().unwrap()), Some(i), "string {:?}", s);
    }
    for (i, t) in dex.type_ids().iter().enumerate() {
        assert_eq!(dex.find_type_id(t.descriptor_idx), Some(i as u32));
        let descriptor = dex.type_descriptor(i as u32).unwrap().to_str().unwrap().into_owned();
        assert_eq!(dex.find_type_by_descriptor(&descriptor), Some(i as u32));
    }
    for (i, p) in dex.proto_ids().iter().enumerate() {
        let params: Vec<u32> = dex.proto_parameters(&p).unwrap().iter().collect();
        assert_eq!(dex.find_proto_id(p.return_type_idx, &params), Some(i as u32));
        let signature = dex.proto_signature(&p).unwrap();
        assert_eq!(dex.find_proto_by_signature(&signature), Some(i as u32), "{}", signature);
    }
    for (i, m) in dex.method_ids().iter().enumerate() {
        assert_eq!(dex.find_method_id(m.class_idx, m.name_idx, m.proto_idx), Some(i as u32));
    }
    for (i, f) in dex.field_ids().iter().enumerate() {
        assert_eq!(dex.find_field_id(f.class_idx, f.name_idx, f.type_idx), Some(i as u32));
    }
}

#[test]
fn misses_are_not_found() {
    let bytes = library_dex();
    let dex = DexFile::open(&bytes).unwrap();

    assert_eq!(dex.find_string_id("Lcom/example/Square;"), None);
    assert_eq!(dex.find_type_by_descriptor("Lcom/example/Square;"), None);
    // "area" is a string but not a type descriptor.
    let area = dex.find_string_id("area").unwrap();
    assert_eq!(dex.find_type_id(area), None);
    assert_eq!(dex.find_type_id(u32::MAX), None);

    let double = dex.find_type_by_descriptor("D").unwrap();
    let int = dex.find_type_by_descriptor("I").unwrap();
    assert!(dex.find_proto_id(double, &[]).is_some());
    assert_eq!(dex.find_proto_id(double, &[int, int, int]), None);
    assert_eq!(dex.find_proto_by_signature("(III)D"), None);
    assert_eq!(dex.find_proto_by_signature("(Lcom/example/Square;)V"), None);
    assert_eq!(dex.find_proto_by_signature("not a signature"), None);

    let shape = dex.find_type_by_descriptor("Lcom/example/Shape;").unwrap();
    let circle = dex.find_type_by_descriptor("Lcom/example/Circle;").unwrap();
    let helper = dex.find_string_id("helper").unwrap();
    let jjj = dex.find_proto_by_signature("(JJ)J").unwrap();
    assert!(dex.find_method_id(shape, helper, jjj).is_some());
    assert_eq!(dex.find_method_id(circle, helper, jjj), None);

    let radius = dex.find_string_id("radius").unwrap();
    assert!(dex.find_field_id(circle, radius, double).is_some());
    assert_eq!(dex.find_field_id(circle, radius, int), None);
    assert_eq!(dex.find_field_id(shape, radius, double), None);

    assert_eq!(dex.find_class_def("Ljava/lang/Object;"), None);
    assert_eq!(dex.find_class_def("Lcom/example/Circle;"), Some(1));
}

#[test]
fn class_data_counts_and_order() {
    let bytes = library_dex();
    let dex = DexFile::open(&bytes).unwrap();

    for class_def in dex.class_defs().iter() {
        let it = dex.class_data(&class_def).unwrap();
        let counts = [
            it.num_static_fields(),
            it.num_instance_fields(),
            it.num_direct_methods(),
            it.num_virtual_methods(),
        ];
        let members: Vec<ClassMember> = it.collect::<Result<_, _>>().unwrap();
        assert_eq!(members.len() as u32, counts.iter().sum::<u32>());

        let mut seen = [0u32; 4];
        let mut previous: Option<(usize, u32)> = None;
        for m in &members {
            let group = match m {
                ClassMember::StaticField(_) => 0,
                ClassMember::InstanceField(_) => 1,
                ClassMember::DirectMethod(_) => 2,
                ClassMember::VirtualMethod(_) => 3,
            };
            seen[group] += 1;
            if let Some((g, idx)) = previous {
                assert!(group >= g);
                if group == g {
                    assert!(m.index() > idx);
                }
            }
            previous = Some((group, m.index()));
            assert_eq!(m.code_off().is_none(), m.is_field() || m.access_flags().is_code_less());
        }
        assert_eq!(seen, counts);
    }

    let empty = dex.class_def(dex.find_class_def("Lcom/example/Empty;").unwrap()).unwrap();
    assert_eq!(empty.class_data_off, None);
    assert_eq!(empty.superclass_idx, None);
    assert_eq!(dex.superclass_descriptor(&empty).unwrap(), None);
    assert!(!dex.class_data(&empty).unwrap().has_next());
}

#[test]
fn class_metadata() {
    let bytes = library_dex();
    let dex = DexFile::open(&bytes).unwrap();

    let shape = dex.class_def(dex.find_class_def("Lcom/example/Shape;").unwrap()).unwrap();
    let interfaces: Vec<String> = dex
        .interfaces(&shape)
        .unwrap()
        .iter()
        .map(|t| dex.type_descriptor(t).unwrap().to_string())
        .collect();
    assert_eq!(interfaces, vec!["Ljava/lang/Comparable;"]);
    assert_eq!(dex.source_file(&shape).unwrap().unwrap(), "Shape.java");

    let circle = dex.class_def(dex.find_class_def("Lcom/example/Circle;").unwrap()).unwrap();
    assert_eq!(dex.superclass_descriptor(&circle).unwrap().unwrap(), "Lcom/example/Shape;");

    let out = dex.find_string_id("out").unwrap();
    let system = dex.find_type_by_descriptor("Ljava/lang/System;").unwrap();
    let print_stream = dex.find_type_by_descriptor("Ljava/io/PrintStream;").unwrap();
    let field = dex.find_field_id(system, out, print_stream).unwrap();
    assert_eq!(dex.field_descriptor(field).unwrap(), "Ljava/lang/System;->out:Ljava/io/PrintStream;");

    let members: Vec<ClassMember> = dex.class_data(&shape).unwrap().collect::<Result<_, _>>().unwrap();
    let scale = members
        .iter()
        .filter(|m| m.is_method())
        .find(|m| dex.method_name(m.index()).unwrap() == "scale")
        .unwrap();
    assert!(scale.access_flags().contains(AccessFlags::ABSTRACT));
    assert_eq!(scale.code_off(), None);
}

/// Every index stored in a record must name an entry of its target table.
fn assert_indices_in_range(dex: &DexFile<'_>) {
    let strings = dex.string_ids().len();
    let types = dex.type_ids().len();
    let protos = dex.proto_ids().len();

    for t in dex.type_ids().iter() {
        assert!(t.descriptor_idx < strings, "{:?}", t);
    }
    for p in dex.proto_ids().iter() {
        assert!(p.shorty_idx < strings, "{:?}", p);
        assert!(p.return_type_idx < types, "{:?}", p);
        assert!(dex.proto_parameters(&p).unwrap().iter().all(|t| t < types), "{:?}", p);
    }
    for f in dex.field_ids().iter() {
        assert!(f.class_idx < types && f.type_idx < types && f.name_idx < strings, "{:?}", f);
    }
    for m in dex.method_ids().iter() {
        assert!(m.class_idx < types && m.proto_idx < protos && m.name_idx < strings, "{:?}", m);
    }
    for c in dex.class_defs().iter() {
        assert!(c.class_idx < types, "{:?}", c);
        assert!(c.superclass_idx.map_or(true, |t| t < types), "{:?}", c);
        assert!(c.source_file_idx.map_or(true, |s| s < strings), "{:?}", c);
        assert!(dex.interfaces(&c).unwrap().iter().all(|t| t < types), "{:?}", c);
    }
}

#[test]
fn record_indices_are_in_range() {
    let bytes = library_dex();
    assert_indices_in_range(&DexFile::open(&bytes).unwrap());

    let bytes = create_method_signature_dex();
    assert_indices_in_range(&DexFile::open(&bytes).unwrap());

    let bytes = nested_dex();
    assert_indices_in_range(&DexFile::open(&bytes).unwrap());
}
