//! Object creation, class queries and introspection.

use crate::container::ObjectId;
use crate::core::{ClassId, PropCode, Revision, TypeCode};
use crate::util::{ByteOrder, Error, Result};

use super::handle::OmfFile;

/// One stored value of an object, as reported by [`OmfFile::object_properties`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PropertyInfo {
    /// Symbolic code, `None` for names the registry does not know.
    pub prop: Option<PropCode>,
    pub prop_name: String,
    pub ty: Option<TypeCode>,
    pub type_name: String,
    pub size: u64,
}

impl OmfFile {
    /// Create an object of `class`.
    pub fn new_object(&mut self, class: ClassId) -> Result<ObjectId> {
        self.check_may_write()?;
        if self.session().registry().class(self.revision(), class).is_none() {
            return Err(Error::BadClass(class));
        }
        let obj = self.container.new_object()?;
        self.write_class_id(obj, PropCode::OBJ_CLASS, class)?;
        Ok(obj)
    }

    /// Delete an object. References to it become dangling.
    pub fn delete_object(&mut self, obj: ObjectId) -> Result<()> {
        self.check_may_write()?;
        if obj == self.head() {
            return Err(Error::ObjectSemantic("the head object cannot be deleted".into()));
        }
        self.container.delete_object(obj)?;
        Ok(())
    }

    /// Class of an object.
    pub fn class_of(&mut self, obj: ObjectId) -> Result<ClassId> {
        self.read_class_id(obj, PropCode::OBJ_CLASS)
    }

    /// True if the object's class is `class` or one of its subclasses.
    pub fn is_type_of(&mut self, obj: ObjectId, class: ClassId) -> Result<bool> {
        let own = self.class_of(obj)?;
        self.class_is_a(own, class)
    }

    /// Direct superclass of `class` in this file's revision.
    pub fn class_find_superclass(&self, class: ClassId) -> Option<ClassId> {
        self.session().registry().class_find_superclass(self.revision(), class)
    }

    /// Give a 1.x object its own byte order.
    pub fn set_object_byte_order(&mut self, obj: ObjectId, order: ByteOrder) -> Result<()> {
        if self.revision() != Revision::V1 {
            return Err(Error::BadProperty(PropCode::OBJ_BYTE_ORDER));
        }
        self.write_byte_order_magic(obj, PropCode::OBJ_BYTE_ORDER, order)
    }

    /// All objects in the file, in creation order.
    pub fn objects(&self) -> Vec<ObjectId> {
        self.container.objects().collect()
    }

    /// Objects of `class` or a subclass.
    pub fn objects_of_class(&mut self, class: ClassId) -> Result<Vec<ObjectId>> {
        let mut found = Vec::new();
        for obj in self.objects() {
            match self.is_type_of(obj, class) {
                Ok(true) => found.push(obj),
                Ok(false) | Err(Error::PropertyNotPresent) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(found)
    }

    /// Stored values of an object with their symbolic codes.
    pub fn object_properties(&mut self, obj: ObjectId) -> Result<Vec<PropertyInfo>> {
        self.sync_schema();
        let values = self.container.values_of(obj)?;
        Ok(values
            .into_iter()
            .map(|v| PropertyInfo {
                prop: self.cache.prop_code(v.prop),
                prop_name: self.container.property_name(v.prop).unwrap_or("?").to_string(),
                ty: self.cache.type_code(v.ty),
                type_name: self.container.type_name(v.ty).unwrap_or("?").to_string(),
                size: v.size,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::{FileOptions, Session};

    #[test]
    fn test_is_type_of_walks_hierarchy() {
        let session = Session::begin().unwrap();
        let mut file = session.create_scratch(FileOptions::new(Revision::V2)).unwrap();
        let cdci = file.new_object(ClassId::CDCI).unwrap();
        assert!(file.is_type_of(cdci, ClassId::CDCI).unwrap());
        assert!(file.is_type_of(cdci, ClassId::DIDD).unwrap());
        assert!(file.is_type_of(cdci, ClassId::MDES).unwrap());
        assert!(!file.is_type_of(cdci, ClassId::MOBJ).unwrap());
        assert_eq!(file.class_find_superclass(ClassId::CDCI), Some(ClassId::DIDD));
        assert_eq!(file.class_find_superclass(ClassId::OOBJ), None);
        assert_eq!(file.objects_of_class(ClassId::MDES).unwrap(), vec![cdci]);
    }

    #[test]
    fn test_unknown_class_rejected() {
        let session = Session::begin().unwrap();
        let mut file = session.create_scratch(FileOptions::new(Revision::V1)).unwrap();
        assert!(matches!(file.new_object(ClassId::CDCI), Err(Error::BadClass(_))));
    }

    #[test]
    fn test_per_object_byte_order_v1() {
        let session = Session::begin().unwrap();
        let mut file = session.create_scratch(FileOptions::new(Revision::V1)).unwrap();
        let trak = file.new_object(ClassId::TRAK).unwrap();
        assert!(!file.is_foreign_byte_order(trak).unwrap());

        file.set_object_byte_order(trak, ByteOrder::native().swapped()).unwrap();
        assert!(file.is_foreign_byte_order(trak).unwrap());
        assert!(!file.is_foreign_byte_order(file.head()).unwrap());

        file.write_length(trak, PropCode::CPNT_LENGTH, 0x0102_0304).unwrap();
        assert_eq!(file.read_length(trak, PropCode::CPNT_LENGTH).unwrap(), 0x0102_0304);

        let mut v2 = session.create_scratch(FileOptions::new(Revision::V2)).unwrap();
        let head = v2.head();
        assert!(v2.set_object_byte_order(head, ByteOrder::Big).is_err());
    }

    #[test]
    fn test_introspection_reports_codes() {
        let session = Session::begin().unwrap();
        let mut file = session.create_scratch(FileOptions::new(Revision::V2)).unwrap();
        let head = file.head();
        let props = file.object_properties(head).unwrap();
        let class = props.iter().find(|p| p.prop == Some(PropCode::OBJ_CLASS)).unwrap();
        assert_eq!(class.prop_name, "OMFI:OOBJ:ObjClass");
        assert_eq!(class.ty, Some(TypeCode::CLASS_ID));
        assert_eq!(class.size, 4);
        assert!(props.iter().any(|p| p.prop == Some(PropCode::HEAD_BYTE_ORDER)));
    }

    #[test]
    fn test_head_cannot_be_deleted() {
        let session = Session::begin().unwrap();
        let mut file = session.create_scratch(FileOptions::default()).unwrap();
        let head = file.head();
        assert!(file.delete_object(head).is_err());
        let obj = file.new_object(ClassId::CMOB).unwrap();
        file.delete_object(obj).unwrap();
        assert!(!file.objects().contains(&obj));
    }
}
