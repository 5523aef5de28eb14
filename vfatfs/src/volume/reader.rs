// SPDX-License-Identifier: MIT

use std::{
    io::{self, Read, Seek, SeekFrom},
    sync::Arc,
};

use crate::volume::{Dispatcher, Volume};

/// [`Read`] + [`Seek`] view of a volume, as if it were a disk image file.
#[derive(Debug)]
pub struct VolumeReader {
    dispatcher: Dispatcher,
    pos: u64,
}

impl VolumeReader {
    pub fn new(volume: Arc<Volume>) -> Self {
        Self::from_dispatcher(Dispatcher::new(volume))
    }

    pub fn from_dispatcher(dispatcher: Dispatcher) -> Self {
        Self { dispatcher, pos: 0 }
    }

    #[inline]
    pub fn position(&self) -> u64 {
        self.pos
    }

    pub fn into_inner(self) -> Dispatcher {
        self.dispatcher
    }
}

impl Read for VolumeReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.dispatcher.read_into(self.pos, buf);
        self.pos += n as u64;
        Ok(n)
    }
}

impl Seek for VolumeReader {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let size = self.dispatcher.volume().image_size();
        let target = match pos {
            SeekFrom::Start(off) => Some(off),
            SeekFrom::End(delta) => size.checked_add_signed(delta),
            SeekFrom::Current(delta) => self.pos.checked_add_signed(delta),
        };
        match target {
            Some(t) => {
                self.pos = t;
                Ok(t)
            }
            None => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek to a negative or overflowing position",
            )),
        }
    }
}
