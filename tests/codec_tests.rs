//! Codec registration, dispatch and delegation through user codecs.

use std::any::Any;
use std::sync::Arc;

use omf::codec::{pass_through, CodecEntry, CodecMetaInfo, CodecOp, CODEC_REVISION, SOUND_KIND};
use omf::media::MediaHandle;
use omf::prelude::*;

type Private = Option<Box<dyn Any + Send>>;

fn meta(id: &str) -> CodecMetaInfo {
    CodecMetaInfo {
        id: id.into(),
        name: format!("{id} test codec"),
        min_revision: Revision::V1,
        max_revision: Revision::V2,
        data_kinds: vec![SOUND_KIND.into()],
        mdes_class: Some(ClassId::WAVD),
        data_class: Some(ClassId::WAVE),
        codec_revision: CODEC_REVISION,
    }
}

/// Implements nothing beyond its metadata.
struct Bare;

impl Codec for Bare {
    fn meta_info(&self) -> CodecMetaInfo {
        meta("BARE")
    }
}

#[derive(Debug, PartialEq)]
struct Marker(u32);

/// Just enough to create a media handle that owns a `Marker`.
struct Outer;

impl Codec for Outer {
    fn meta_info(&self) -> CodecMetaInfo {
        meta("OUTR")
    }

    fn init_mdes_props(&self, _file: &mut OmfFile, _mdes: ObjectId) -> Result<()> {
        Ok(())
    }

    fn create(&self, media: &mut MediaHandle, _file: &mut OmfFile) -> Result<()> {
        media.set_user_data(Marker(7));
        Ok(())
    }

    fn close(&self, _media: &mut MediaHandle, _file: &mut OmfFile) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, PartialEq)]
struct Counter(u64);

/// Counts calls in its own state and optionally fails after counting.
struct Inner {
    fail: bool,
}

impl Codec for Inner {
    fn meta_info(&self) -> CodecMetaInfo {
        meta("INNR")
    }

    fn get_info(&self, media: &mut MediaHandle, _file: &mut OmfFile, _selector: InfoSelector) -> Result<MediaInfo> {
        assert_eq!(media.codec_id(), "INNR");
        assert!(media.user_data_ref::<Marker>().is_none());
        let counter = media
            .user_data_mut::<Counter>()
            .ok_or_else(|| Error::Media("inner state missing".into()))?;
        counter.0 += 1;
        if self.fail {
            return Err(Error::Media("induced failure".into()));
        }
        Ok(MediaInfo::SampleCount(counter.0))
    }
}

fn outer_media(session: &Session) -> (OmfFile, MediaHandle) {
    session.register_codec(Arc::new(Outer)).expect("register outer");
    let mut file = session.create_scratch(FileOptions::new(Revision::V2)).expect("scratch");
    let params = MediaParams::new(Uid::new(4, 4, 4), DataKind::Sound, Rational::new(48000, 1));
    let media = MediaHandle::create(&mut file, "OUTR", params).expect("create");
    (file, media)
}

fn run_slot(
    op: CodecOp,
    codec: &Arc<CodecEntry>,
    media: &mut MediaHandle,
    file: &mut OmfFile,
    private: &mut Private,
) -> Result<()> {
    let mdes = media.mdes();
    let mut buf = [0u8; 8];
    match op {
        CodecOp::GetNumChannels => codec.num_channels(file, mdes, DataKind::Sound).map(|_| ()),
        CodecOp::InitMdesProps => codec.init_mdes_props(file, mdes),
        CodecOp::SemanticCheck => codec.semantic_check(file, mdes),
        _ => pass_through(codec, media, private, |c, m| match op {
            CodecOp::Open => c.open(m, file),
            CodecOp::Create => c.create(m, file),
            CodecOp::Close => c.close(m, file),
            CodecOp::GetInfo => c.get_info(m, file, InfoSelector::Audio).map(|_| ()),
            CodecOp::PutInfo => c.put_info(m, file, &MediaInfo::SampleCount(0)),
            CodecOp::ReadSamples => c.read_samples(m, file, 1, &mut buf).map(|_| ()),
            CodecOp::WriteSamples => c.write_samples(m, file, 1, &buf),
            CodecOp::ReadLines => c.read_lines(m, file, 1, &mut buf),
            CodecOp::WriteLines => c.write_lines(m, file, 1, &buf),
            CodecOp::SetFrame => c.set_frame(m, file, 1),
            CodecOp::GetFrameOffset => c.get_frame_offset(m, file, 1).map(|_| ()),
            CodecOp::AddFrameIndexEntry => c.add_frame_index_entry(m, file, 0),
            CodecOp::GetNumChannels | CodecOp::InitMdesProps | CodecOp::SemanticCheck => unreachable!(),
        }),
    }
}

#[test]
fn test_bare_codec_reports_every_slot_unsupported() {
    let session = Session::begin().expect("session");
    let (mut file, mut media) = outer_media(&session);
    let bare = Arc::new(CodecEntry::new(Arc::new(Bare)).expect("entry"));
    let mut private: Private = None;

    for op in CodecOp::ALL {
        let err = run_slot(op, &bare, &mut media, &mut file, &mut private).expect_err(op.name());
        assert!(err.is_unsupported(), "{op}: {err}");
        match err {
            Error::InvalidOpForCodec { codec, op: name } => {
                assert_eq!(codec, "BARE");
                assert_eq!(name, op.name());
            }
            other => panic!("{op}: unexpected {other}"),
        }
    }
    assert_eq!(media.codec_id(), "OUTR");
    assert_eq!(media.user_data_ref::<Marker>(), Some(&Marker(7)));
    media.close(&mut file).expect("close");
}

#[test]
fn test_pass_through_restores_handle_on_success_and_failure() {
    let session = Session::begin().expect("session");
    let (mut file, mut media) = outer_media(&session);
    let outer = media.codec().clone();
    let marker_addr = media.user_data_ref::<Marker>().expect("outer state") as *const Marker;

    let mut private: Private = Some(Box::new(Counter(0)));
    let counter_addr = private
        .as_ref()
        .and_then(|b| b.downcast_ref::<Counter>())
        .expect("counter") as *const Counter;

    let ok = Arc::new(CodecEntry::new(Arc::new(Inner { fail: false })).expect("entry"));
    let info = pass_through(&ok, &mut media, &mut private, |c, m| {
        c.get_info(m, &mut file, InfoSelector::SampleCount)
    })
    .expect("inner call");
    assert_eq!(info, MediaInfo::SampleCount(1));
    assert!(Arc::ptr_eq(media.codec(), &outer));
    assert_eq!(media.user_data_ref::<Marker>().expect("outer state") as *const Marker, marker_addr);

    let failing = Arc::new(CodecEntry::new(Arc::new(Inner { fail: true })).expect("entry"));
    let err = pass_through(&failing, &mut media, &mut private, |c, m| {
        c.get_info(m, &mut file, InfoSelector::SampleCount)
    })
    .expect_err("induced failure");
    assert!(matches!(err, Error::Media(_)));
    assert!(Arc::ptr_eq(media.codec(), &outer));
    assert_eq!(media.user_data_ref::<Marker>().expect("outer state") as *const Marker, marker_addr);

    // The inner state stayed the same allocation and kept both increments.
    let counter = private
        .as_ref()
        .and_then(|b| b.downcast_ref::<Counter>())
        .expect("counter");
    assert_eq!(counter, &Counter(2));
    assert_eq!(counter as *const Counter, counter_addr);
    media.close(&mut file).expect("close");
}

#[test]
fn test_registration_rules() {
    let session = Session::begin().expect("session");
    assert_eq!(session.codec_ids(), vec!["WAVE", "AIFC", "CDCI", "AVR"]);
    session.register_codec(Arc::new(Bare)).expect("first registration");
    assert!(matches!(
        session.register_codec(Arc::new(Bare)),
        Err(Error::DuplicateCodec(id)) if id == "BARE"
    ));

    struct Future;
    impl Codec for Future {
        fn meta_info(&self) -> CodecMetaInfo {
            CodecMetaInfo {
                codec_revision: CODEC_REVISION + 1,
                ..meta("FUTR")
            }
        }
    }
    assert!(matches!(
        session.register_codec(Arc::new(Future)),
        Err(Error::CodecRevision { .. })
    ));

    let for_cdci: Vec<String> = session
        .codecs_for_class(ClassId::CDCI)
        .iter()
        .map(|c| c.id().to_string())
        .collect();
    assert_eq!(for_cdci, vec!["AVR", "CDCI"]);
    assert!(session.codecs_for_class(ClassId::RGBA).is_empty());
}

#[test]
fn test_newest_accepting_codec_wins_on_open() {
    let session = Session::begin().expect("session");
    let mut file = session.create_scratch(FileOptions::new(Revision::V2)).expect("scratch");
    let mob_id = Uid::new(8, 8, 8);
    let params = MediaParams::new(mob_id, DataKind::Sound, Rational::new(48000, 1));
    let mut media = MediaHandle::create(&mut file, "WAVE", params).expect("create");
    media.write_samples(&mut file, 2, &[0u8; 4]).expect("write");
    media.close(&mut file).expect("close");

    // Registered after WAVE under the same descriptor class. Bare has no
    // semantic check, which counts as acceptance, and then cannot open.
    session.register_codec(Arc::new(Bare)).expect("register");
    assert!(matches!(
        MediaHandle::open(&mut file, mob_id),
        Err(Error::InvalidOpForCodec { codec, op: "open" }) if codec == "BARE"
    ));
    assert_eq!(file.open_media_count(), 0);
}

/// Accepts the descriptor, then fails to start the stream.
struct FailingCreate;

impl Codec for FailingCreate {
    fn meta_info(&self) -> CodecMetaInfo {
        meta("FAIL")
    }

    fn init_mdes_props(&self, _file: &mut OmfFile, _mdes: ObjectId) -> Result<()> {
        Ok(())
    }

    fn create(&self, _media: &mut MediaHandle, _file: &mut OmfFile) -> Result<()> {
        Err(Error::Media("disk full".into()))
    }
}

#[test]
fn test_failed_create_leaves_no_source_mob() {
    let session = Session::begin().expect("session");
    session.register_codec(Arc::new(FailingCreate)).expect("register");
    for rev in Revision::ALL {
        let mut file = session.create_scratch(FileOptions::new(rev)).expect("scratch");
        let head = file.head();
        let mob_id = Uid::new(6, 6, 6);
        let params = MediaParams::new(mob_id, DataKind::Sound, Rational::new(48000, 1));

        assert!(matches!(
            MediaHandle::create(&mut file, "FAIL", params),
            Err(Error::Media(msg)) if msg == "disk full"
        ));
        assert_eq!(file.open_media_count(), 0);
        assert!(file.read_obj_refs(head, PropCode::HEAD_MOBS).expect("mobs").is_empty());
        assert!(file.read_obj_refs(head, PropCode::HEAD_MEDIA_DATA).expect("data").is_empty());
        if rev == Revision::V1 {
            assert_eq!(file.mob_index_len(head, PropCode::HEAD_SOURCE_MOBS).expect("index"), 0);
        }
        for class in [ClassId::SMOB, ClassId::WAVD, ClassId::WAVE] {
            assert!(file.objects_of_class(class).expect("objects").is_empty(), "{class}");
        }
        assert!(MediaHandle::open(&mut file, mob_id).is_err());
        file.close().expect("close");
    }
}
