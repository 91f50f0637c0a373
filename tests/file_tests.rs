//! Property access through files written to disk and read back.

use omf::core::ClassKind;
use omf::file::{FileOptions, SwapPolicy, MIN_STRING_SIZE};
use omf::media::MediaHandle;
use omf::prelude::*;
use tempfile::NamedTempFile;

const TEST_CLASS: ClassId = ClassId(*b"TEST");

fn session() -> Session {
    Session::begin().expect("session should start")
}

#[test]
fn test_custom_class_rational_survives_reopen() {
    let temp = NamedTempFile::new().expect("temp file");
    let session = session();
    session
        .register_class(ClassKind::Concrete, ValidRevisions::Both, TEST_CLASS, Some(ClassId::OOBJ))
        .expect("register class");
    let aspect = session
        .register_dynamic_property(ValidRevisions::Both, "TEST:Aspect", TEST_CLASS, TypeCode::RATIONAL, false)
        .expect("register property");

    let mut file = session.create_file(temp.path(), Revision::V2).expect("create");
    let obj = file.new_object(TEST_CLASS).expect("new object");
    file.write_rational(obj, aspect, Rational::new(4, 3)).expect("write");
    file.close().expect("close");

    let mut file = session.open_file(temp.path()).expect("reopen");
    let obj = file
        .objects_of_class(TEST_CLASS)
        .expect("objects of class")
        .into_iter()
        .next()
        .expect("custom object should survive");
    assert_eq!(file.read_rational(obj, aspect).expect("read"), Rational::new(4, 3));
    assert!(file.is_type_of(obj, ClassId::OOBJ).expect("is_type_of"));
}

#[test]
fn test_big_endian_file_stores_big_endian_bytes() {
    let temp = NamedTempFile::new().expect("temp file");
    let session = session();
    let options = FileOptions::new(Revision::V2).with_byte_order(ByteOrder::Big);
    session.create_file_with(temp.path(), options).expect("create").close().expect("close");

    let mut file = session.open_file_modify(temp.path()).expect("open");
    assert_eq!(file.byte_order(), ByteOrder::Big);
    let sclp = file.new_object(ClassId::SCLP).expect("new object");
    file.write_i32(sclp, PropCode::SCLP_SOURCE_TRACK, 0x0102_0304).expect("write");

    let mut raw = [0u8; 4];
    file.read_prop(sclp, PropCode::SCLP_SOURCE_TRACK, 0, SwapPolicy::NoSwap, TypeCode::INT32, &mut raw)
        .expect("raw read");
    assert_eq!(raw, [0x01, 0x02, 0x03, 0x04]);
    assert_eq!(file.read_i32(sclp, PropCode::SCLP_SOURCE_TRACK).expect("typed read"), 0x0102_0304);
    file.close().expect("close");

    let mut file = session.open_file(temp.path()).expect("reopen");
    let sclp = file.objects_of_class(ClassId::SCLP).expect("sclp")[0];
    assert_eq!(file.read_i32(sclp, PropCode::SCLP_SOURCE_TRACK).expect("read"), 0x0102_0304);
}

#[test]
fn test_remove_middle_of_obj_ref_array() {
    let temp = NamedTempFile::new().expect("temp file");
    let session = session();
    let mut file = session.create_file(temp.path(), Revision::V2).expect("create");
    let sequ = file.new_object(ClassId::SEQU).expect("sequence");
    let clips: Vec<ObjectId> = (0..5)
        .map(|_| file.new_object(ClassId::FILL).expect("fill"))
        .collect();
    for &clip in &clips {
        file.append_obj_ref(sequ, PropCode::SEQU_COMPONENTS, clip).expect("append");
    }

    file.remove_nth_obj_ref(sequ, PropCode::SEQU_COMPONENTS, 3).expect("remove");
    let expected = vec![clips[0], clips[1], clips[3], clips[4]];
    assert_eq!(file.read_obj_refs(sequ, PropCode::SEQU_COMPONENTS).expect("read"), expected);
    assert!(matches!(
        file.remove_nth_obj_ref(sequ, PropCode::SEQU_COMPONENTS, 0),
        Err(Error::RequirePositive)
    ));
    assert!(matches!(
        file.read_nth_obj_ref(sequ, PropCode::SEQU_COMPONENTS, 5),
        Err(Error::BadIndex { index: 5, len: 4 })
    ));
    file.close().expect("close");

    let mut file = session.open_file(temp.path()).expect("reopen");
    let sequ = file.objects_of_class(ClassId::SEQU).expect("sequ")[0];
    assert_eq!(file.obj_ref_array_len(sequ, PropCode::SEQU_COMPONENTS).expect("len"), 4);
}

#[test]
fn test_writes_blocked_while_media_streams() {
    let temp = NamedTempFile::new().expect("temp file");
    let session = session();
    let mut file = session.create_file(temp.path(), Revision::V2).expect("create");
    let head = file.head();
    let mob = file.new_object(ClassId::CMOB).expect("composition mob");

    let params = MediaParams::new(Uid::new(1, 2, 3), DataKind::Sound, Rational::new(44100, 1));
    let media = MediaHandle::create(&mut file, "WAVE", params).expect("create media");

    assert!(matches!(
        file.write_string(mob, PropCode::MOBJ_NAME, "blocked"),
        Err(Error::WriteBlockedByMedia(_))
    ));
    assert!(matches!(file.new_object(ClassId::FILL), Err(Error::WriteBlockedByMedia(_))));
    // Reads still work.
    assert_eq!(file.read_obj_refs(head, PropCode::HEAD_MOBS).expect("mobs").len(), 1);

    media.close(&mut file).expect("close media");
    file.write_string(mob, PropCode::MOBJ_NAME, "allowed").expect("write after close");
    assert_eq!(file.read_string(mob, PropCode::MOBJ_NAME).expect("read"), "allowed");
    file.close().expect("close");
}

#[test]
fn test_close_refuses_open_media() {
    let session = session();
    let mut file = session.create_scratch(FileOptions::new(Revision::V2)).expect("scratch");
    let params = MediaParams::new(Uid::new(9, 9, 9), DataKind::Sound, Rational::new(48000, 1));
    let _media = MediaHandle::create(&mut file, "AIFC", params).expect("create media");
    assert!(matches!(file.close(), Err(Error::MediaStillOpen(1))));
}

#[test]
fn test_both_revisions_round_trip_common_properties() {
    let session = session();
    for rev in Revision::ALL {
        let temp = NamedTempFile::new().expect("temp file");
        let mut file = session.create_file(temp.path(), rev).expect("create");
        let clip = file.new_object(ClassId::SCLP).expect("clip");
        file.write_exact_edit_rate(clip, PropCode::CPNT_EDIT_RATE, Rational::new(30000, 1001))
            .expect("edit rate");
        file.write_length(clip, PropCode::CPNT_LENGTH, 1234).expect("length");
        file.write_string(clip, PropCode::CPNT_NAME, "V1").expect("name");
        file.close().expect("close");

        let mut file = session.open_file(temp.path()).expect("reopen");
        assert_eq!(file.revision(), rev);
        let clip = file.objects_of_class(ClassId::SCLP).expect("clips")[0];
        assert_eq!(
            file.read_exact_edit_rate(clip, PropCode::CPNT_EDIT_RATE).expect("edit rate"),
            Rational::new(30000, 1001)
        );
        assert_eq!(file.read_length(clip, PropCode::CPNT_LENGTH).expect("length"), 1234);
        assert_eq!(file.read_string(clip, PropCode::CPNT_NAME).expect("name"), "V1");
    }
}

#[test]
fn test_length_promotes_to_64_bit_in_v2() {
    let temp = NamedTempFile::new().expect("temp file");
    let session = session();
    let mut file = session.create_file(temp.path(), Revision::V2).expect("create");
    let clip = file.new_object(ClassId::SCLP).expect("clip");
    let long = i64::from(u32::MAX) * 4;
    file.write_length(clip, PropCode::CPNT_LENGTH, long).expect("write");
    assert!(file.is_prop_present(clip, PropCode::CPNT_LENGTH, TypeCode::LENGTH64).expect("present"));
    assert!(!file.is_prop_present(clip, PropCode::CPNT_LENGTH, TypeCode::LENGTH32).expect("present"));
    file.close().expect("close");

    let mut file = session.open_file(temp.path()).expect("reopen");
    let clip = file.objects_of_class(ClassId::SCLP).expect("clips")[0];
    assert_eq!(file.read_length(clip, PropCode::CPNT_LENGTH).expect("read"), long);
}

#[test]
fn test_strings_keep_minimum_size_on_disk() {
    let temp = NamedTempFile::new().expect("temp file");
    let session = session();
    let mut file = session.create_file(temp.path(), Revision::V1).expect("create");
    let mob = file.new_object(ClassId::SMOB).expect("mob");
    file.write_string(mob, PropCode::MOBJ_NAME, "x").expect("write");
    file.close().expect("close");

    let mut file = session.open_file(temp.path()).expect("reopen");
    let mob = file.objects_of_class(ClassId::SMOB).expect("mobs")[0];
    let stored = file.prop_length(mob, PropCode::MOBJ_NAME, TypeCode::STRING).expect("length");
    assert_eq!(stored as usize, MIN_STRING_SIZE);
    assert_eq!(file.read_string(mob, PropCode::MOBJ_NAME).expect("read"), "x");
}

#[test]
fn test_missing_file_is_reported() {
    let session = session();
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("absent.omf");
    assert!(session.open_file(&path).is_err());
}

#[test]
fn test_dropped_media_can_be_aborted_and_file_saved() {
    let temp = NamedTempFile::new().expect("temp file");
    let session = session();
    let mut file = session.create_file(temp.path(), Revision::V2).expect("create");
    let mob = file.new_object(ClassId::CMOB).expect("composition mob");

    let params = MediaParams::new(Uid::new(5, 6, 7), DataKind::Sound, Rational::new(44100, 1));
    let media = MediaHandle::create(&mut file, "WAVE", params).expect("create media");
    let lost = media.id();
    drop(media);

    assert!(matches!(
        file.write_string(mob, PropCode::MOBJ_NAME, "blocked"),
        Err(Error::WriteBlockedByMedia(_))
    ));
    assert!(matches!(file.close(), Err(Error::MediaStillOpen(1))));

    // The failed close left the file open and unsaved.
    assert_eq!(file.open_media(), vec![lost]);
    assert!(file.abort_media(lost));
    file.write_string(mob, PropCode::MOBJ_NAME, "kept").expect("write after abort");
    file.close().expect("close");

    let mut file = session.open_file(temp.path()).expect("reopen");
    let mob = file.objects_of_class(ClassId::CMOB).expect("mobs")[0];
    assert_eq!(file.read_string(mob, PropCode::MOBJ_NAME).expect("read"), "kept");
}
