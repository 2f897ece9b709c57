use fsbinder::formats::aux_table::AuxTables;
use fsbinder::formats::{BinderFile, Bnd3, Bnd4, Bxf3, Bxf4, Format};
use fsbinder::{Binder, Error, read_binder};

fn two_entry_bnd4() -> Bnd4 {
    let mut bnd = Bnd4::new("07D7R6", Format::IDS_NAMES);
    bnd.unicode = false;
    bnd.files.push(BinderFile::new(0, "a.txt", vec![0x41, 0x42]));
    bnd.files.push(BinderFile::new(1, "b.txt", vec![]));
    bnd
}

fn le_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes(bytes[at..at + 4].try_into().unwrap())
}

fn le_i64(bytes: &[u8], at: usize) -> i64 {
    i64::from_le_bytes(bytes[at..at + 8].try_into().unwrap())
}

#[test]
fn two_entry_layout_is_exact() {
    let bytes = two_entry_bnd4().write().unwrap();

    assert_eq!(Format::IDS_NAMES.header_size(), 0x1C);
    assert_eq!(bytes.len(), 0xA0);
    assert_eq!(le_i64(&bytes, 0x28), 0x84);

    // Entry 0 at 0x40, entry 1 at 0x5C.
    assert_eq!(bytes[0x40], 0x40);
    assert_eq!(le_u32(&bytes, 0x44), u32::MAX);
    assert_eq!(le_i64(&bytes, 0x48), 2);
    assert_eq!(le_u32(&bytes, 0x50), 0x90);
    assert_eq!(le_u32(&bytes, 0x54), 0);
    assert_eq!(le_u32(&bytes, 0x58), 0x78);
    assert_eq!(le_i64(&bytes, 0x64), 0);
    assert_eq!(le_u32(&bytes, 0x6C), 0xA0);
    assert_eq!(le_u32(&bytes, 0x70), 1);
    assert_eq!(le_u32(&bytes, 0x74), 0x7E);

    assert_eq!(&bytes[0x78..0x84], b"a.txt\0b.txt\0");
    assert!(bytes[0x84..0x90].iter().all(|&b| b == 0));
    assert_eq!(&bytes[0x90..0x92], &[0x41, 0x42]);
}

#[test]
fn names_resolve_by_offset_not_by_order() {
    let mut bytes = two_entry_bnd4().write().unwrap();
    bytes[0x78..0x84].copy_from_slice(b"b.txt\0a.txt\0");
    bytes[0x58..0x5C].copy_from_slice(&0x7Eu32.to_le_bytes());
    bytes[0x74..0x78].copy_from_slice(&0x78u32.to_le_bytes());

    let bnd = Bnd4::read(&bytes).unwrap();
    assert_eq!(bnd.files[0].name.as_deref(), Some("a.txt"));
    assert_eq!(bnd.files[0].bytes, [0x41, 0x42]);
    assert_eq!(bnd.files[1].name.as_deref(), Some("b.txt"));
    assert!(bnd.files[1].is_empty());
}

#[test]
fn unknown_magic_is_rejected() {
    let mut bytes = two_entry_bnd4().write().unwrap();
    bytes[..4].copy_from_slice(b"DCX\0");
    assert!(matches!(read_binder(&bytes), Err(Error::BadMagic(m)) if &m == b"DCX\0"));
    assert!(matches!(Bnd4::read(&bytes), Err(Error::BadMagic(_))));
    assert!(matches!(Bnd3::read(&bytes), Err(Error::BadMagic(_))));
}

#[test]
fn truncated_container_fails_cleanly() {
    let bytes = two_entry_bnd4().write().unwrap();
    for len in [0, 3, 0x20, 0x41, 0x80, 0x91] {
        assert!(Bnd4::read(&bytes[..len]).is_err(), "length {len:#x}");
    }
}

#[test]
fn rewrite_reproduces_input() {
    let mut bnd3 = Bnd3::new("07D7R6", Format::new(0x54).unwrap());
    bnd3.files.push(BinderFile::new(1000, "param\\a.param", vec![3; 0x33]));
    bnd3.files.push(BinderFile::new(1001, "param\\b.param", vec![4; 0x10]));
    let bytes = bnd3.write().unwrap();
    assert_eq!(Bnd3::read(&bytes).unwrap().write().unwrap(), bytes);

    let bytes = two_entry_bnd4().write().unwrap();
    assert_eq!(Bnd4::read(&bytes).unwrap().write().unwrap(), bytes);
}

#[test]
fn forced_big_endian_format() {
    let mut bnd = Bnd4::new("07D7R6", Format::BIG_ENDIAN_IDS_NAMES);
    bnd.files.push(BinderFile::new(0x0102_0304, "x", vec![9]));
    let bytes = bnd.write().unwrap();
    assert_eq!(bytes[0x09], 0);
    assert_eq!(&bytes[0x0C..0x10], &[0, 0, 0, 1]);
    assert_eq!(Bnd4::read(&bytes).unwrap(), bnd);
}

#[test]
fn extended_split_binder_keeps_aux_tables() {
    let mut bxf = Bxf4::new("20180405", Format::IDS_NAMES_SIZES);
    bxf.extended = 4;
    bxf.files.push(BinderFile::new(0, "x", vec![1; 3]));
    bxf.aux = Some(AuxTables {
        marker: 0x0008_0810,
        first: vec![(1, 0)],
        second: vec![(0xCAFE_F00D, 0)],
    });
    let (bhd, bdt) = bxf.write().unwrap();
    let back = Bxf4::read(&bhd, &bdt).unwrap();
    assert_eq!(back, bxf);
    assert_eq!(back.write().unwrap(), (bhd, bdt));
}

#[test]
fn split_binders_through_the_filesystem() {
    let dir = std::env::temp_dir();
    let bhd = dir.join(format!("fsbinder-{}.bhd", std::process::id()));
    let bdt = dir.join(format!("fsbinder-{}.bdt", std::process::id()));

    let mut bxf = Bxf3::new("07D7R6", Format::IDS_NAMES_SIZES);
    bxf.files.push(BinderFile::new(7, "sound\\fe.fsb", vec![0x5A; 0x21]));
    bxf.write_paths(&bhd, &bdt).unwrap();
    let back = Bxf3::read_paths(&bhd, &bdt).unwrap();
    assert_eq!(back, bxf);

    let binder = Binder::read_split(&std::fs::read(&bhd).unwrap(), &std::fs::read(&bdt).unwrap()).unwrap();
    assert_eq!(binder.files()[0].id, Some(7));

    std::fs::remove_file(bhd).unwrap();
    std::fs::remove_file(bdt).unwrap();
}

#[cfg(feature = "compression")]
mod compressed {
    use fsbinder::compression::CompressionType;
    use fsbinder::formats::{BinderFile, Bnd4, FileFlags, Format};

    fn payload() -> Vec<u8> {
        (0..4096u32).map(|i| (i % 7) as u8).collect()
    }

    #[test]
    fn every_scheme_round_trips() {
        let mut bnd = Bnd4::new("07D7R6", Format::IDS_NAMES_SIZES);
        for (id, kind) in [CompressionType::Zlib, CompressionType::Zstd, CompressionType::Lz4]
            .into_iter()
            .enumerate()
        {
            bnd.files
                .push(BinderFile::new(id as i32, format!("{kind:?}.bin"), payload()).compressed(kind));
        }
        bnd.files.push(BinderFile::new(9, "plain.bin", payload()));

        let bytes = bnd.write().unwrap();
        assert!(bytes.len() < 2 * 4096);

        let back = Bnd4::read(&bytes).unwrap();
        assert_eq!(back, bnd);
        assert_eq!(back.files[0].flags, FileFlags::COMPRESSED);
        assert_eq!(back.files[2].compression, CompressionType::Lz4);
        assert_eq!(back.write().unwrap(), bytes);
    }

    #[test]
    fn size_mismatch_is_reported() {
        let mut bnd = Bnd4::new("07D7R6", Format::IDS_NAMES_SIZES);
        bnd.files
            .push(BinderFile::new(0, "z", payload()).compressed(CompressionType::Zlib));
        let mut bytes = bnd.write().unwrap();
        // Uncompressed size of the only entry.
        bytes[0x50..0x58].copy_from_slice(&4095i64.to_le_bytes());
        assert!(matches!(
            Bnd4::read(&bytes),
            Err(fsbinder::Error::Compression(_))
        ));
    }
}
