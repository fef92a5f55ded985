use super::Db;
use crate::error::Error;
use std::sync::Arc;

/// The fixed set of 16 logical databases a server instance owns.
pub struct Databases {
    dbs: Vec<Arc<Db>>,
}

impl Databases {
    pub fn new(count: u8) -> Databases {
        let dbs = (0..count).map(|_| Arc::new(Db::new())).collect();
        Databases { dbs }
    }

    pub fn len(&self) -> usize {
        self.dbs.len()
    }

    pub fn get(&self, index: usize) -> Result<Arc<Db>, Error> {
        self.dbs.get(index).cloned().ok_or(Error::InvalidDbIndex)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &Arc<Db>)> {
        self.dbs.iter().enumerate()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn select_in_range() {
        let dbs = Databases::new(16);
        assert!(dbs.get(0).is_ok());
        assert!(dbs.get(15).is_ok());
    }

    #[test]
    fn select_out_of_range() {
        let dbs = Databases::new(16);
        assert_eq!(dbs.get(16), Err(Error::InvalidDbIndex));
    }

    #[test]
    fn databases_are_isolated() {
        use bytes::Bytes;
        use std::time::Instant;
        let dbs = Databases::new(16);
        let now = Instant::now();
        let db0 = dbs.get(0).unwrap();
        db0.set(
            Bytes::from_static(b"k"),
            Bytes::from_static(b"v"),
            crate::db::Override::Always,
            None,
            now,
        );
        let db1 = dbs.get(1).unwrap();
        assert_eq!(db1.get(b"k", now), None);
    }
}
