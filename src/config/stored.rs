//! Persistent storage of the handoff configuration in NOR flash.
//!
//! Written by whichever part of the bootloader selects the image to run, and read back before handing off.
//! Leverages `sequential-storage` and `postcard` to store and serialize/deserialize the record.

use embedded_storage_async::nor_flash::NorFlash;
use sequential_storage::{
    cache::KeyPointerCache,
    map::{SerializationError, Value},
};

use crate::{Error, config::Config, log};

/// Number of flash pages the record partition spans.
pub const PAGE_COUNT: usize = 2;

/// Leading byte of a record, to be bumped whenever the layout of [`Config`] changes.
const FORMAT: u8 = 1;

/// Format byte followed by the postcard encoding, of which the varint base and mask take up to 5 bytes each.
const RECORD_SIZE: usize = 16;

/// A [`Config`] as laid out on flash.
struct Record(Config);

impl<'a> Value<'a> for Record {
    fn serialize_into(&self, buffer: &mut [u8]) -> Result<usize, SerializationError> {
        let (format, body) = buffer
            .split_first_mut()
            .ok_or(SerializationError::BufferTooSmall)?;
        *format = FORMAT;

        let body = postcard::to_slice(&self.0, body).map_err(encoding_error)?;
        Ok(1 + body.len())
    }

    fn deserialize_from(buffer: &'a [u8]) -> Result<Self, SerializationError>
    where
        Self: Sized,
    {
        match buffer.split_first() {
            Some((&FORMAT, body)) => postcard::from_bytes(body)
                .map(Record)
                .map_err(encoding_error),
            // Written by a bootloader of a different generation.
            Some(_) => Err(SerializationError::InvalidFormat),
            None => Err(SerializationError::BufferTooSmall),
        }
    }
}

fn encoding_error(e: postcard::Error) -> SerializationError {
    match e {
        postcard::Error::SerializeBufferFull | postcard::Error::DeserializeUnexpectedEnd => {
            SerializationError::BufferTooSmall
        }
        _ => SerializationError::InvalidFormat,
    }
}

/// Handoff configuration as kept in a dedicated NOR partition of [`PAGE_COUNT`] pages.
pub struct StoredConfig<NVM: NorFlash> {
    config: Option<Config>,
    nvm: NVM,
    nvm_cache: KeyPointerCache<PAGE_COUNT, (), 1>,
}

impl<NVM: NorFlash> StoredConfig<NVM> {
    pub async fn new(mut nvm: NVM) -> Result<Self, Error> {
        let nvm_size = nvm.capacity() as u32;
        let mut nvm_cache: KeyPointerCache<PAGE_COUNT, (), 1> = KeyPointerCache::new();

        let mut data_buffer = [0u8; RECORD_SIZE];

        let record = sequential_storage::map::fetch_item::<(), Record, _>(
            &mut nvm,
            0..nvm_size,
            &mut nvm_cache,
            &mut data_buffer,
            &(),
        )
        .await
        .map_err(|_| Error::Storage)?;
        let config = record.map(|Record(config)| config);

        if config.is_none() {
            log::debug!("config NVM does not contain value");
        }

        Ok(Self {
            config,
            nvm,
            nvm_cache,
        })
    }

    /// Configuration as last stored, if any.
    pub fn get(&self) -> Option<&Config> {
        self.config.as_ref()
    }

    /// Configuration to hand off with: the stored one if it can be programmed into the core, `fallback` otherwise.
    pub fn resolve(&self, fallback: Config) -> Config {
        match self.config {
            Some(config) if config.validate().is_ok() => config,
            Some(config) => {
                log::warn!("ignoring stored {}", config);
                fallback
            }
            None => fallback,
        }
    }

    pub async fn store(&mut self, config: Config) -> Result<(), Error> {
        let mut data_buffer = [0u8; RECORD_SIZE];
        let nvm_size = self.nvm.capacity() as u32;

        log::debug!("storing {}", config);

        sequential_storage::map::store_item::<(), Record, _>(
            &mut self.nvm,
            0..nvm_size,
            &mut self.nvm_cache,
            &mut data_buffer,
            &(),
            &Record(config),
        )
        .await
        .map_err(|_| Error::Storage)?;

        self.config = Some(config);
        Ok(())
    }

    /// Release the underlying partition.
    pub fn free(self) -> NVM {
        self.nvm
    }
}
