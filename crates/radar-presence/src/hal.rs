//! Bus transfer strategy.
//!
//! A bus adapter must implement byte transfers and may additionally offer
//! native 16-bit word transfers, which avoid re-packing sample data. The
//! choice is made once when the adapter is registered with
//! [`TransferStrategy::register`]; every transfer afterwards goes straight to
//! the resolved path.

use byteorder::{BigEndian, ByteOrder};

use crate::error::SensorError;

/// Bus adapter for one or more sensors.
pub trait SpiTransfer {
    /// Full-duplex transfer of `buffer`, in place.
    fn transfer(&mut self, sensor_id: u32, buffer: &mut [u8]) -> Result<(), SensorError>;

    /// Largest single transfer in bytes.
    fn max_transfer_size(&self) -> usize;

    /// Whether [`SpiTransfer::transfer_words`] is implemented.
    fn supports_word_transfer(&self) -> bool {
        false
    }

    /// Full-duplex transfer of big-endian 16-bit words, in place.
    fn transfer_words(&mut self, _sensor_id: u32, _words: &mut [u16]) -> Result<(), SensorError> {
        Err(SensorError::UnsupportedTransfer)
    }
}

/// Path resolved at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferPath {
    /// Adapter transfers words natively.
    Word,
    /// Words are packed into bytes on the way out and unpacked on the way back.
    Byte,
}

/// A registered bus adapter with its transfer path fixed.
#[derive(Debug)]
pub struct TransferStrategy<T> {
    bus: T,
    path: TransferPath,
    max_transfer_size: usize,
    scratch: Vec<u8>,
}

impl<T: SpiTransfer> TransferStrategy<T> {
    /// Register `bus` and resolve its transfer path.
    pub fn register(bus: T) -> Result<Self, SensorError> {
        let max_transfer_size = bus.max_transfer_size() & !1;
        if max_transfer_size == 0 {
            return Err(SensorError::transfer(format!(
                "max transfer size {} cannot carry a 16-bit word",
                bus.max_transfer_size()
            )));
        }
        let path = if bus.supports_word_transfer() {
            TransferPath::Word
        } else {
            TransferPath::Byte
        };
        tracing::debug!(?path, max_transfer_size, "registered bus adapter");

        let scratch = match path {
            TransferPath::Word => Vec::new(),
            TransferPath::Byte => vec![0; max_transfer_size],
        };
        Ok(Self {
            bus,
            path,
            max_transfer_size,
            scratch,
        })
    }

    #[must_use]
    pub fn path(&self) -> TransferPath {
        self.path
    }

    #[must_use]
    pub fn bus(&self) -> &T {
        &self.bus
    }

    pub fn into_inner(self) -> T {
        self.bus
    }

    /// Byte transfer, split into chunks the adapter accepts.
    pub fn transfer_bytes(&mut self, sensor_id: u32, bytes: &mut [u8]) -> Result<(), SensorError> {
        for chunk in bytes.chunks_mut(self.max_transfer_size) {
            self.bus.transfer(sensor_id, chunk)?;
        }
        Ok(())
    }

    /// Word transfer over the resolved path.
    pub fn transfer_words(&mut self, sensor_id: u32, words: &mut [u16]) -> Result<(), SensorError> {
        let words_per_chunk = self.max_transfer_size / 2;
        match self.path {
            TransferPath::Word => {
                for chunk in words.chunks_mut(words_per_chunk) {
                    self.bus.transfer_words(sensor_id, chunk)?;
                }
            }
            TransferPath::Byte => {
                for chunk in words.chunks_mut(words_per_chunk) {
                    let bytes = &mut self.scratch[..chunk.len() * 2];
                    BigEndian::write_u16_into(chunk, bytes);
                    self.bus.transfer(sensor_id, bytes)?;
                    BigEndian::read_u16_into(bytes, chunk);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Echoes every byte inverted and records chunk sizes.
    #[derive(Default)]
    struct InvertingBus {
        max: usize,
        words: bool,
        byte_chunks: Vec<usize>,
        word_chunks: Vec<usize>,
    }

    impl SpiTransfer for InvertingBus {
        fn transfer(&mut self, _sensor_id: u32, buffer: &mut [u8]) -> Result<(), SensorError> {
            self.byte_chunks.push(buffer.len());
            buffer.iter_mut().for_each(|b| *b = !*b);
            Ok(())
        }

        fn max_transfer_size(&self) -> usize {
            self.max
        }

        fn supports_word_transfer(&self) -> bool {
            self.words
        }

        fn transfer_words(&mut self, _sensor_id: u32, words: &mut [u16]) -> Result<(), SensorError> {
            if !self.words {
                return Err(SensorError::UnsupportedTransfer);
            }
            self.word_chunks.push(words.len());
            words.iter_mut().for_each(|w| *w = !*w);
            Ok(())
        }
    }

    #[test]
    fn word_capable_bus_uses_word_path() {
        let bus = InvertingBus {
            max: 8,
            words: true,
            ..InvertingBus::default()
        };
        let mut strategy = TransferStrategy::register(bus).unwrap();
        assert_eq!(strategy.path(), TransferPath::Word);

        let mut words = [0x1234u16, 0x0000, 0xffff, 0xa5a5, 0x0f0f];
        strategy.transfer_words(1, &mut words).unwrap();
        assert_eq!(words, [0xedcb, 0xffff, 0x0000, 0x5a5a, 0xf0f0]);
        assert_eq!(strategy.bus().word_chunks, vec![4, 1]);
        assert!(strategy.bus().byte_chunks.is_empty());
    }

    #[test]
    fn byte_only_bus_falls_back_to_packed_bytes() {
        let bus = InvertingBus {
            max: 7,
            ..InvertingBus::default()
        };
        let mut strategy = TransferStrategy::register(bus).unwrap();
        assert_eq!(strategy.path(), TransferPath::Byte);

        let mut words = [0x1234u16, 0x00ff, 0xabcd, 0x8000];
        strategy.transfer_words(1, &mut words).unwrap();
        assert_eq!(words, [0xedcb, 0xff00, 0x5432, 0x7fff]);
        // 7 byte limit rounds down to 3 words per chunk
        assert_eq!(strategy.into_inner().byte_chunks, vec![6, 2]);
    }

    #[test]
    fn byte_transfers_are_chunked() {
        let bus = InvertingBus {
            max: 4,
            ..InvertingBus::default()
        };
        let mut strategy = TransferStrategy::register(bus).unwrap();
        let mut bytes = [0u8; 10];
        strategy.transfer_bytes(2, &mut bytes).unwrap();
        assert!(bytes.iter().all(|&b| b == 0xff));
        assert_eq!(strategy.bus().byte_chunks, vec![4, 4, 2]);
    }

    #[test]
    fn adapter_without_room_for_a_word_is_rejected() {
        let bus = InvertingBus {
            max: 1,
            ..InvertingBus::default()
        };
        assert!(matches!(
            TransferStrategy::register(bus),
            Err(SensorError::Transfer { .. })
        ));
    }
}
