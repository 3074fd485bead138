//-
// Copyright (c) 2026, the Mudmail authors
//
// This file is part of Mudmail.
//
// Mudmail is free software: you can redistribute it and/or modify it under the
// terms of  the GNU General Public  License as published by  the Free Software
// Foundation, either version  3 of the License, or (at  your option) any later
// version.
//
// Mudmail is distributed in the hope that  it will be useful,  but WITHOUT ANY
// WARRANTY; without  even the implied  warranty of MERCHANTABILITY  or FITNESS
// FOR  A PARTICULAR  PURPOSE.  See the  GNU General  Public  License for  more
// details.
//
// You should have received a copy of the GNU General Public License along with
// Mudmail. If not, see <http://www.gnu.org/licenses/>.

//! Small extensions for working with files and I/O results.

use std::io::{self, Read};

pub trait ReadUninterruptibly: Read {
    fn read_uninteruptibly(&mut self, dst: &mut [u8]) -> io::Result<usize>;
}

impl<R: Read> ReadUninterruptibly for R {
    /// Read bytes into `dst` until `dst` is full or EOF is reached, returning
    /// the number of bytes actually read.
    ///
    /// `Interrupted` errors are retried. Other errors are propagated.
    fn read_uninteruptibly(&mut self, mut dst: &mut [u8]) -> io::Result<usize> {
        let mut total = 0;
        while !dst.is_empty() {
            match self.read(dst) {
                Ok(0) => break,
                Ok(n) => {
                    total += n;
                    dst = &mut dst[n..];
                }
                Err(e) if io::ErrorKind::Interrupted == e.kind() => continue,
                Err(e) => return Err(e),
            }
        }

        Ok(total)
    }
}

pub trait IgnoreKinds {
    /// Turn a `NotFound` error into the default value of the result type.
    fn ignore_not_found(self) -> Self;
}

impl<R: Default> IgnoreKinds for Result<R, io::Error> {
    fn ignore_not_found(self) -> Self {
        match self {
            Ok(r) => Ok(r),
            Err(e) if io::ErrorKind::NotFound == e.kind() => Ok(R::default()),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod test {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    /// Yields one byte per call and fails with `Interrupted` in between.
    struct Stuttering {
        data: Vec<u8>,
        interrupt: bool,
    }

    impl Read for Stuttering {
        fn read(&mut self, dst: &mut [u8]) -> io::Result<usize> {
            self.interrupt = !self.interrupt;
            if self.interrupt {
                return Err(io::Error::new(io::ErrorKind::Interrupted, "eintr"));
            }

            if self.data.is_empty() || dst.is_empty() {
                return Ok(0);
            }

            dst[0] = self.data.remove(0);
            Ok(1)
        }
    }

    #[test]
    fn read_uninterruptibly_fills_until_eof() {
        let mut src = Stuttering {
            data: b"plugh".to_vec(),
            interrupt: false,
        };
        let mut buf = [0u8; 8];
        assert_eq!(5, src.read_uninteruptibly(&mut buf).unwrap());
        assert_eq!(b"plugh\0\0\0", &buf);
    }

    #[test]
    fn not_found_becomes_default() {
        let tmpdir = TempDir::new().unwrap();
        let missing = tmpdir.path().join("nx");
        assert_eq!(
            "",
            fs::read_to_string(&missing).ignore_not_found().unwrap()
        );

        fs::write(&missing, "xyzzy").unwrap();
        assert_eq!(
            "xyzzy",
            fs::read_to_string(&missing).ignore_not_found().unwrap()
        );
    }
}
