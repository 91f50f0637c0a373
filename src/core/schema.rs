//! Built-in 1.x and 2.x schema.
//!
//! Codes are stable across revisions; the per-revision differences live in
//! the rows below (a property such as `CPNT:EditRate` is one code with an
//! `ExactEditRate` row for 1.x and a `Rational` row for 2.x).

use super::ids::{ClassId, PropCode, TypeCode, ValidRevisions};
use super::registry::{ClassKind, Registry, SwapNeed};
use crate::util::Result;

use ClassKind::{Abstract, Concrete};
use SwapNeed::{Never, Required};
use ValidRevisions::{Both, V1Only, V2Only};

impl TypeCode {
    pub const BOOLEAN: Self = Self(1);
    pub const INT8: Self = Self(2);
    pub const INT16: Self = Self(3);
    pub const INT32: Self = Self(4);
    pub const INT64: Self = Self(5);
    pub const UINT8: Self = Self(6);
    pub const UINT16: Self = Self(7);
    pub const UINT32: Self = Self(8);
    pub const RATIONAL: Self = Self(9);
    pub const EXACT_EDIT_RATE: Self = Self(10);
    pub const UID: Self = Self(11);
    pub const TIME_STAMP: Self = Self(12);
    pub const VERSION_TYPE: Self = Self(13);
    pub const PRODUCT_VERSION: Self = Self(14);
    pub const CLASS_ID: Self = Self(15);
    pub const OBJECT_TAG: Self = Self(16);
    pub const STRING: Self = Self(17);
    pub const UNIQUE_NAME: Self = Self(18);
    pub const POSITION32: Self = Self(19);
    pub const POSITION64: Self = Self(20);
    pub const LENGTH32: Self = Self(21);
    pub const LENGTH64: Self = Self(22);
    pub const OBJ_REF: Self = Self(23);
    pub const OBJ_REF_ARRAY: Self = Self(24);
    pub const MOB_INDEX: Self = Self(25);
    pub const DATA_VALUE: Self = Self(26);
    pub const VAR_LEN_BYTES: Self = Self(27);
    pub const FRAME_LAYOUT: Self = Self(28);
    pub const FADE_TYPE: Self = Self(29);
    pub const EDIT_HINT: Self = Self(30);
    pub const POSITION32_ARRAY: Self = Self(31);
}

impl PropCode {
    pub const OBJ_CLASS: Self = Self(1);
    pub const OBJ_BYTE_ORDER: Self = Self(2);
    pub const HEAD_BYTE_ORDER: Self = Self(3);
    pub const HEAD_VERSION: Self = Self(4);
    pub const HEAD_LAST_MODIFIED: Self = Self(5);
    pub const HEAD_TOOLKIT_VERSION: Self = Self(6);
    pub const HEAD_MOBS: Self = Self(7);
    pub const HEAD_MEDIA_DATA: Self = Self(8);
    pub const HEAD_SOURCE_MOBS: Self = Self(9);
    pub const HEAD_PRIMARY_MOBS: Self = Self(10);
    pub const MOBJ_MOB_ID: Self = Self(11);
    pub const MOBJ_NAME: Self = Self(12);
    pub const MOBJ_CREATION_TIME: Self = Self(13);
    pub const MOBJ_LAST_MODIFIED: Self = Self(14);
    pub const MOBJ_SLOTS: Self = Self(15);
    pub const SMOB_MEDIA_DESCRIPTION: Self = Self(16);
    pub const CPNT_EDIT_RATE: Self = Self(17);
    pub const CPNT_LENGTH: Self = Self(18);
    pub const CPNT_EDIT_HINT: Self = Self(19);
    pub const CPNT_NAME: Self = Self(20);
    pub const SCLP_SOURCE_ID: Self = Self(21);
    pub const SCLP_SOURCE_TRACK: Self = Self(22);
    pub const SCLP_START_TIME: Self = Self(23);
    pub const SCLP_FADE_IN_TYPE: Self = Self(24);
    pub const SEQU_COMPONENTS: Self = Self(25);
    pub const DDEF_DATA_KIND_ID: Self = Self(26);
    pub const MDFL_SAMPLE_RATE: Self = Self(27);
    pub const MDFL_LENGTH: Self = Self(28);
    pub const MDFL_IS_OMFI: Self = Self(29);
    pub const DIDD_STORED_WIDTH: Self = Self(30);
    pub const DIDD_STORED_HEIGHT: Self = Self(31);
    pub const DIDD_FRAME_LAYOUT: Self = Self(32);
    pub const DIDD_COMPRESSION: Self = Self(33);
    pub const CDCI_COMPONENT_WIDTH: Self = Self(34);
    pub const CDCI_HORIZ_SUBSAMPLING: Self = Self(35);
    pub const WAVD_SUMMARY: Self = Self(36);
    pub const AIFD_SUMMARY: Self = Self(37);
    pub const MDAT_MOB_ID: Self = Self(38);
    pub const IDAT_IMAGE_DATA: Self = Self(39);
    pub const IDAT_FRAME_INDEX: Self = Self(40);
    pub const WAVE_DATA: Self = Self(41);
    pub const AIFC_DATA: Self = Self(42);
}

const CLASSES: &[(ClassKind, ValidRevisions, ClassId, Option<ClassId>)] = &[
    (Abstract, Both, ClassId::OOBJ, None),
    (Concrete, Both, ClassId::HEAD, Some(ClassId::OOBJ)),
    (Abstract, Both, ClassId::MOBJ, Some(ClassId::OOBJ)),
    (Concrete, Both, ClassId::SMOB, Some(ClassId::MOBJ)),
    (Concrete, Both, ClassId::CMOB, Some(ClassId::MOBJ)),
    (Abstract, Both, ClassId::CPNT, Some(ClassId::OOBJ)),
    (Concrete, V1Only, ClassId::TRAK, Some(ClassId::CPNT)),
    (Abstract, V2Only, ClassId::SEGM, Some(ClassId::CPNT)),
    (Concrete, V2Only, ClassId::MSLT, Some(ClassId::OOBJ)),
    (Concrete, V1Only, ClassId::SCLP, Some(ClassId::CPNT)),
    (Concrete, V2Only, ClassId::SCLP, Some(ClassId::SEGM)),
    (Concrete, V1Only, ClassId::FILL, Some(ClassId::CPNT)),
    (Concrete, V2Only, ClassId::FILL, Some(ClassId::SEGM)),
    (Concrete, V1Only, ClassId::SEQU, Some(ClassId::CPNT)),
    (Concrete, V2Only, ClassId::SEQU, Some(ClassId::SEGM)),
    (Concrete, V2Only, ClassId::DDEF, Some(ClassId::OOBJ)),
    (Abstract, Both, ClassId::MDES, Some(ClassId::OOBJ)),
    (Abstract, Both, ClassId::MDFL, Some(ClassId::MDES)),
    (Abstract, Both, ClassId::DIDD, Some(ClassId::MDFL)),
    (Concrete, V2Only, ClassId::CDCI, Some(ClassId::DIDD)),
    (Concrete, V2Only, ClassId::RGBA, Some(ClassId::DIDD)),
    (Concrete, Both, ClassId::WAVD, Some(ClassId::MDFL)),
    (Concrete, Both, ClassId::AIFD, Some(ClassId::MDFL)),
    (Abstract, Both, ClassId::MDAT, Some(ClassId::OOBJ)),
    (Concrete, V2Only, ClassId::IDAT, Some(ClassId::MDAT)),
    (Concrete, Both, ClassId::WAVE, Some(ClassId::MDAT)),
    (Concrete, Both, ClassId::AIFC, Some(ClassId::MDAT)),
];

const TYPES: &[(TypeCode, ValidRevisions, &str, SwapNeed)] = &[
    (TypeCode::BOOLEAN, Both, "Boolean", Never),
    (TypeCode::INT8, Both, "Int8", Never),
    (TypeCode::INT16, Both, "Int16", Required),
    (TypeCode::INT32, Both, "Int32", Required),
    (TypeCode::INT64, V2Only, "Int64", Required),
    (TypeCode::UINT8, Both, "UInt8", Never),
    (TypeCode::UINT16, Both, "UInt16", Required),
    (TypeCode::UINT32, Both, "UInt32", Required),
    (TypeCode::RATIONAL, Both, "Rational", Required),
    (TypeCode::EXACT_EDIT_RATE, V1Only, "ExactEditRate", Required),
    (TypeCode::UID, Both, "UID", Required),
    (TypeCode::TIME_STAMP, Both, "TimeStamp", Required),
    (TypeCode::VERSION_TYPE, Both, "VersionType", Never),
    (TypeCode::PRODUCT_VERSION, Both, "ProductVersion", Required),
    (TypeCode::CLASS_ID, V2Only, "ClassID", Never),
    (TypeCode::OBJECT_TAG, V1Only, "ObjectTag", Never),
    (TypeCode::STRING, Both, "String", Never),
    (TypeCode::UNIQUE_NAME, Both, "UniqueName", Never),
    (TypeCode::POSITION32, Both, "Position32", Required),
    (TypeCode::POSITION64, V2Only, "Position64", Required),
    (TypeCode::LENGTH32, Both, "Length32", Required),
    (TypeCode::LENGTH64, V2Only, "Length64", Required),
    (TypeCode::OBJ_REF, Both, "ObjRef", Required),
    (TypeCode::OBJ_REF_ARRAY, Both, "ObjRefArray", Required),
    (TypeCode::MOB_INDEX, V1Only, "MobIndex", Required),
    (TypeCode::DATA_VALUE, Both, "DataValue", Never),
    (TypeCode::VAR_LEN_BYTES, Both, "VarLenBytes", Never),
    (TypeCode::FRAME_LAYOUT, Both, "FrameLayout", Required),
    (TypeCode::FADE_TYPE, V2Only, "FadeType", Required),
    (TypeCode::EDIT_HINT, V2Only, "EditHint", Required),
    (TypeCode::POSITION32_ARRAY, Both, "Position32Array", Required),
];

/// (code, revisions, name, class scope, type, optional)
type PropSpec = (PropCode, ValidRevisions, &'static str, ClassId, TypeCode, bool);

const PROPS: &[PropSpec] = &[
    (PropCode::OBJ_CLASS, V1Only, "ObjID", ClassId::OOBJ, TypeCode::OBJECT_TAG, false),
    (PropCode::OBJ_CLASS, V2Only, "OOBJ:ObjClass", ClassId::OOBJ, TypeCode::CLASS_ID, false),
    (PropCode::OBJ_BYTE_ORDER, V1Only, "ByteOrder", ClassId::OOBJ, TypeCode::INT16, true),
    (PropCode::HEAD_BYTE_ORDER, Both, "HEAD:ByteOrder", ClassId::HEAD, TypeCode::INT16, false),
    (PropCode::HEAD_VERSION, Both, "HEAD:Version", ClassId::HEAD, TypeCode::VERSION_TYPE, false),
    (PropCode::HEAD_LAST_MODIFIED, Both, "HEAD:LastModified", ClassId::HEAD, TypeCode::TIME_STAMP, false),
    (PropCode::HEAD_TOOLKIT_VERSION, Both, "HEAD:ToolkitVersion", ClassId::HEAD, TypeCode::PRODUCT_VERSION, true),
    (PropCode::HEAD_MOBS, Both, "HEAD:Mobs", ClassId::HEAD, TypeCode::OBJ_REF_ARRAY, false),
    (PropCode::HEAD_MEDIA_DATA, Both, "HEAD:MediaData", ClassId::HEAD, TypeCode::OBJ_REF_ARRAY, false),
    (PropCode::HEAD_SOURCE_MOBS, V1Only, "HEAD:SourceMobs", ClassId::HEAD, TypeCode::MOB_INDEX, true),
    (PropCode::HEAD_PRIMARY_MOBS, V2Only, "HEAD:PrimaryMobs", ClassId::HEAD, TypeCode::OBJ_REF_ARRAY, true),
    (PropCode::MOBJ_MOB_ID, Both, "MOBJ:MobID", ClassId::MOBJ, TypeCode::UID, false),
    (PropCode::MOBJ_NAME, Both, "MOBJ:Name", ClassId::MOBJ, TypeCode::STRING, true),
    (PropCode::MOBJ_CREATION_TIME, Both, "MOBJ:CreationTime", ClassId::MOBJ, TypeCode::TIME_STAMP, true),
    (PropCode::MOBJ_LAST_MODIFIED, Both, "MOBJ:LastModified", ClassId::MOBJ, TypeCode::TIME_STAMP, true),
    (PropCode::MOBJ_SLOTS, Both, "MOBJ:Slots", ClassId::MOBJ, TypeCode::OBJ_REF_ARRAY, true),
    (PropCode::SMOB_MEDIA_DESCRIPTION, Both, "SMOB:MediaDescription", ClassId::SMOB, TypeCode::OBJ_REF, false),
    (PropCode::CPNT_EDIT_RATE, V1Only, "CPNT:EditRate", ClassId::CPNT, TypeCode::EXACT_EDIT_RATE, false),
    (PropCode::CPNT_EDIT_RATE, V2Only, "CPNT:EditRate", ClassId::CPNT, TypeCode::RATIONAL, false),
    (PropCode::CPNT_LENGTH, Both, "CPNT:Length", ClassId::CPNT, TypeCode::LENGTH32, false),
    (PropCode::CPNT_LENGTH, V2Only, "CPNT:Length", ClassId::CPNT, TypeCode::LENGTH64, false),
    (PropCode::CPNT_EDIT_HINT, V2Only, "CPNT:EditHint", ClassId::CPNT, TypeCode::EDIT_HINT, true),
    (PropCode::CPNT_NAME, Both, "CPNT:Name", ClassId::CPNT, TypeCode::STRING, true),
    (PropCode::SCLP_SOURCE_ID, Both, "SCLP:SourceID", ClassId::SCLP, TypeCode::UID, false),
    (PropCode::SCLP_SOURCE_TRACK, Both, "SCLP:SourceTrackID", ClassId::SCLP, TypeCode::INT32, false),
    (PropCode::SCLP_START_TIME, Both, "SCLP:StartTime", ClassId::SCLP, TypeCode::POSITION32, false),
    (PropCode::SCLP_START_TIME, V2Only, "SCLP:StartTime", ClassId::SCLP, TypeCode::POSITION64, false),
    (PropCode::SCLP_FADE_IN_TYPE, V2Only, "SCLP:FadeInType", ClassId::SCLP, TypeCode::FADE_TYPE, true),
    (PropCode::SEQU_COMPONENTS, Both, "SEQU:Components", ClassId::SEQU, TypeCode::OBJ_REF_ARRAY, false),
    (PropCode::DDEF_DATA_KIND_ID, V2Only, "DDEF:DataKindID", ClassId::DDEF, TypeCode::UNIQUE_NAME, false),
    (PropCode::MDFL_SAMPLE_RATE, V1Only, "MDFL:SampleRate", ClassId::MDFL, TypeCode::EXACT_EDIT_RATE, false),
    (PropCode::MDFL_SAMPLE_RATE, V2Only, "MDFL:SampleRate", ClassId::MDFL, TypeCode::RATIONAL, false),
    (PropCode::MDFL_LENGTH, Both, "MDFL:Length", ClassId::MDFL, TypeCode::LENGTH32, false),
    (PropCode::MDFL_LENGTH, V2Only, "MDFL:Length", ClassId::MDFL, TypeCode::LENGTH64, false),
    (PropCode::MDFL_IS_OMFI, Both, "MDFL:IsOMFI", ClassId::MDFL, TypeCode::BOOLEAN, true),
    (PropCode::DIDD_STORED_WIDTH, Both, "DIDD:StoredWidth", ClassId::DIDD, TypeCode::INT32, false),
    (PropCode::DIDD_STORED_HEIGHT, Both, "DIDD:StoredHeight", ClassId::DIDD, TypeCode::INT32, false),
    (PropCode::DIDD_FRAME_LAYOUT, Both, "DIDD:FrameLayout", ClassId::DIDD, TypeCode::FRAME_LAYOUT, false),
    (PropCode::DIDD_COMPRESSION, Both, "DIDD:Compression", ClassId::DIDD, TypeCode::STRING, true),
    (PropCode::CDCI_COMPONENT_WIDTH, V2Only, "CDCI:ComponentWidth", ClassId::CDCI, TypeCode::INT32, false),
    (PropCode::CDCI_HORIZ_SUBSAMPLING, V2Only, "CDCI:HorizontalSubsampling", ClassId::CDCI, TypeCode::UINT32, false),
    (PropCode::WAVD_SUMMARY, Both, "WAVD:Summary", ClassId::WAVD, TypeCode::DATA_VALUE, false),
    (PropCode::AIFD_SUMMARY, Both, "AIFD:Summary", ClassId::AIFD, TypeCode::DATA_VALUE, false),
    (PropCode::MDAT_MOB_ID, Both, "MDAT:MobID", ClassId::MDAT, TypeCode::UID, false),
    (PropCode::IDAT_IMAGE_DATA, V2Only, "IDAT:ImageData", ClassId::IDAT, TypeCode::DATA_VALUE, false),
    (PropCode::IDAT_FRAME_INDEX, V2Only, "IDAT:FrameIndex", ClassId::IDAT, TypeCode::POSITION32_ARRAY, true),
    (PropCode::WAVE_DATA, Both, "WAVE:Data", ClassId::WAVE, TypeCode::DATA_VALUE, false),
    (PropCode::AIFC_DATA, Both, "AIFC:Data", ClassId::AIFC, TypeCode::DATA_VALUE, false),
];

/// Register the built-in classes, types and properties.
pub(crate) fn install(reg: &mut Registry) -> Result<()> {
    for &(kind, valid, id, superclass) in CLASSES {
        reg.register_class(kind, valid, id, superclass)?;
    }
    for &(code, valid, name, swap) in TYPES {
        reg.register_type(code, valid, name, swap)?;
    }
    for &(code, valid, name, class, ty, optional) in PROPS {
        reg.register_property(code, valid, name, class, ty, optional)?;
    }
    Ok(())
}
