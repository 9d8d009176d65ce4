// collection.rs - ordered image collection with optional on-device mirroring
use crate::image_record::{ImageId, ImageRecord, NewImage, SourceKind};
use crate::storage::{self, SharedStore, IMAGES_KEY};

#[derive(Default)]
pub struct ImageCollection {
    records: Vec<ImageRecord>,
    mirror:  Option<SharedStore>,
}

impl ImageCollection {
    /// In-memory only.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore from `store` and mirror every later mutation back to it.
    /// Entries that are not data URLs are skipped with a warning.
    pub fn mirrored(store: SharedStore) -> Self {
        let records = storage::load_string_list(store.as_ref(), IMAGES_KEY)
            .iter()
            .filter_map(|url| match NewImage::from_data_url(SourceKind::Uploaded, url) {
                Ok(img) => Some(ImageRecord::assign(ImageId::new(), img)),
                Err(e) => {
                    log::warn!("dropping stored image: {}", e);
                    None
                }
            })
            .collect::<Vec<_>>();
        if !records.is_empty() {
            log::info!("restored {} image(s) from storage", records.len());
        }
        Self { records, mirror: Some(store) }
    }

    pub fn add(&mut self, image: NewImage) -> ImageId {
        let id = ImageId::new();
        self.records.push(ImageRecord::assign(id, image));
        self.sync();
        id
    }

    /// `true` when something was removed; absent ids are a no-op.
    pub fn remove(&mut self, id: ImageId) -> bool {
        let before = self.records.len();
        self.records.retain(|r| r.id() != id);
        let removed = self.records.len() != before;
        if removed {
            self.sync();
        }
        removed
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.sync();
    }

    pub fn get(&self, id: ImageId) -> Option<&ImageRecord> {
        self.records.iter().find(|r| r.id() == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ImageRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn sync(&self) {
        let Some(store) = &self.mirror else { return };
        let urls: Vec<String> = self.records.iter().map(ImageRecord::data_url).collect();
        if let Err(e) = storage::save_string_list(store.as_ref(), IMAGES_KEY, &urls) {
            log::error!("failed to persist image collection: {}", e);
        }
    }
}
