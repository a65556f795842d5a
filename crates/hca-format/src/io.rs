//! 只读 I/O 抽象层.
//!
//! HCA 解码器消费一个可定位的字节源, 这个字节源可以是文件、内存缓冲区,
//! 也可以是 ACB/AWB 归档中已经定位好的一段区间 (由调用方通过
//! [`ReaderBackend`] 包装任意 `Read + Seek` 提供).

use std::io::{self, Read, Seek, SeekFrom};

use hca_core::{HcaError, HcaResult};

/// I/O 后端 trait
///
/// 实现此 trait 以支持不同的字节来源.
pub trait IoBackend: Send {
    /// 读取数据, 返回实际读取的字节数 (0 表示末尾)
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
    /// 定位
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64>;
    /// 当前位置
    fn position(&mut self) -> io::Result<u64>;
    /// 总大小 (如果可知)
    fn size(&self) -> Option<u64>;
}

/// 默认读缓冲区大小 (32 KB)
const DEFAULT_BUFFER_SIZE: usize = 32 * 1024;

/// I/O 上下文
///
/// 在后端之上提供带缓冲的读取与大端整数读取.
pub struct IoContext {
    /// 内部 I/O 实现
    inner: Box<dyn IoBackend>,
    /// 读缓冲区
    buffer: Vec<u8>,
    /// 缓冲区中的有效数据长度
    buf_len: usize,
    /// 缓冲区当前读取位置
    buf_pos: usize,
}

impl IoContext {
    /// 从 I/O 后端创建上下文
    pub fn new(backend: Box<dyn IoBackend>) -> Self {
        Self {
            inner: backend,
            buffer: vec![0u8; DEFAULT_BUFFER_SIZE],
            buf_len: 0,
            buf_pos: 0,
        }
    }

    /// 从文件路径打开
    pub fn open_read(path: impl AsRef<std::path::Path>) -> HcaResult<Self> {
        let file = std::fs::File::open(path)?;
        Ok(Self::new(Box::new(ReaderBackend::new(file))))
    }

    /// 从内存数据创建
    pub fn from_bytes(data: impl Into<Vec<u8>>) -> Self {
        Self::new(Box::new(MemoryBackend::from_data(data.into())))
    }

    /// 包装任意可定位读取器
    pub fn from_reader<R: Read + Seek + Send + 'static>(reader: R) -> Self {
        Self::new(Box::new(ReaderBackend::new(reader)))
    }

    /// 尽量读满 `buf`, 返回实际读取的字节数
    ///
    /// 只有到达末尾时返回值才会小于 `buf.len()`.
    pub fn read(&mut self, buf: &mut [u8]) -> HcaResult<usize> {
        let mut total_read = 0;
        while total_read < buf.len() {
            let buffered = self.buf_len - self.buf_pos;
            if buffered > 0 {
                let to_copy = buffered.min(buf.len() - total_read);
                buf[total_read..total_read + to_copy]
                    .copy_from_slice(&self.buffer[self.buf_pos..self.buf_pos + to_copy]);
                self.buf_pos += to_copy;
                total_read += to_copy;
            } else {
                self.buf_pos = 0;
                self.buf_len = self.inner.read(&mut self.buffer)?;
                if self.buf_len == 0 {
                    break;
                }
            }
        }
        Ok(total_read)
    }

    /// 读取指定字节数, 数据不足时返回 [`HcaError::Eof`]
    pub fn read_exact(&mut self, buf: &mut [u8]) -> HcaResult<()> {
        if self.read(buf)? < buf.len() {
            return Err(HcaError::Eof);
        }
        Ok(())
    }

    /// 读取 1 个字节
    pub fn read_u8(&mut self) -> HcaResult<u8> {
        let mut buf = [0u8; 1];
        self.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    /// 读取 u16 大端
    pub fn read_u16_be(&mut self) -> HcaResult<u16> {
        let mut buf = [0u8; 2];
        self.read_exact(&mut buf)?;
        Ok(u16::from_be_bytes(buf))
    }

    /// 读取 u32 大端
    pub fn read_u32_be(&mut self) -> HcaResult<u32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(u32::from_be_bytes(buf))
    }

    /// 读取指定数量的字节
    pub fn read_bytes(&mut self, count: usize) -> HcaResult<Vec<u8>> {
        let mut buf = vec![0u8; count];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// 定位, 会清空读缓冲区
    pub fn seek(&mut self, pos: SeekFrom) -> HcaResult<u64> {
        // 相对定位需要扣除缓冲区中尚未消耗的数据
        let pos = match pos {
            SeekFrom::Current(offset) => {
                SeekFrom::Current(offset - (self.buf_len - self.buf_pos) as i64)
            }
            other => other,
        };
        self.buf_pos = 0;
        self.buf_len = 0;
        Ok(self.inner.seek(pos)?)
    }

    /// 当前逻辑位置 (考虑读缓冲区中尚未消耗的数据)
    pub fn position(&mut self) -> HcaResult<u64> {
        let raw_pos = self.inner.position()?;
        let buffered = (self.buf_len - self.buf_pos) as u64;
        Ok(raw_pos - buffered)
    }

    /// 总大小
    pub fn size(&self) -> Option<u64> {
        self.inner.size()
    }
}

/// 通用读取器后端 (文件, 游标, 归档中的子区间等)
pub struct ReaderBackend<R> {
    reader: R,
    size: Option<u64>,
}

impl<R: Read + Seek> ReaderBackend<R> {
    /// 包装读取器, 尝试探测总大小
    pub fn new(mut reader: R) -> Self {
        let size = reader.stream_position().ok().and_then(|start| {
            let end = reader.seek(SeekFrom::End(0)).ok()?;
            reader.seek(SeekFrom::Start(start)).ok()?;
            Some(end)
        });
        Self { reader, size }
    }
}

impl<R: Read + Seek + Send> IoBackend for ReaderBackend<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }

    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.reader.seek(pos)
    }

    fn position(&mut self) -> io::Result<u64> {
        self.reader.stream_position()
    }

    fn size(&self) -> Option<u64> {
        self.size
    }
}

/// 内存缓冲区后端
///
/// 用于测试和内存中处理.
pub struct MemoryBackend {
    /// 数据缓冲区
    data: Vec<u8>,
    /// 当前位置
    pos: usize,
}

impl MemoryBackend {
    /// 从已有数据创建
    pub fn from_data(data: Vec<u8>) -> Self {
        Self { data, pos: 0 }
    }

    /// 获取内部数据的引用
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl IoBackend for MemoryBackend {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let available = self.data.len().saturating_sub(self.pos);
        let to_read = buf.len().min(available);
        if to_read == 0 {
            return Ok(0);
        }
        buf[..to_read].copy_from_slice(&self.data[self.pos..self.pos + to_read]);
        self.pos += to_read;
        Ok(to_read)
    }

    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let new_pos = match pos {
            SeekFrom::Start(offset) => offset as i64,
            SeekFrom::End(offset) => self.data.len() as i64 + offset,
            SeekFrom::Current(offset) => self.pos as i64 + offset,
        };
        if new_pos < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek 位置不能为负",
            ));
        }
        self.pos = new_pos as usize;
        Ok(self.pos as u64)
    }

    fn position(&mut self) -> io::Result<u64> {
        Ok(self.pos as u64)
    }

    fn size(&self) -> Option<u64> {
        Some(self.data.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_内存读取与定位() {
        let mut io = IoContext::from_bytes(vec![0x12, 0x34, 0x56, 0x78, 0x9A]);
        assert_eq!(io.read_u16_be().unwrap(), 0x1234);
        assert_eq!(io.position().unwrap(), 2);
        io.seek(SeekFrom::Start(1)).unwrap();
        assert_eq!(io.read_u32_be().unwrap(), 0x3456_789A);
        assert!(matches!(io.read_u8(), Err(HcaError::Eof)));
        assert_eq!(io.size(), Some(5));
    }

    #[test]
    fn test_短读取返回实际长度() {
        let mut io = IoContext::from_bytes(vec![1, 2, 3]);
        io.seek(SeekFrom::Start(1)).unwrap();
        let mut buf = [0u8; 8];
        assert_eq!(io.read(&mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], &[2, 3]);
    }

    #[test]
    fn test_相对定位扣除缓冲() {
        let mut io = IoContext::from_bytes((0u8..16).collect::<Vec<_>>());
        assert_eq!(io.read_u8().unwrap(), 0);
        io.seek(SeekFrom::Current(2)).unwrap();
        assert_eq!(io.read_u8().unwrap(), 3);
    }

    #[test]
    fn test_文件后端() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"HCA\0abcd").unwrap();
        file.flush().unwrap();
        let mut io = IoContext::open_read(file.path()).unwrap();
        assert_eq!(io.size(), Some(8));
        assert_eq!(io.read_bytes(4).unwrap(), b"HCA\0");
        io.seek(SeekFrom::Start(6)).unwrap();
        assert_eq!(io.read_bytes(2).unwrap(), b"cd");
    }

    #[test]
    fn test_读取器后端保留起始位置() {
        let mut cursor = std::io::Cursor::new(vec![9u8, 8, 7, 6]);
        cursor.set_position(2);
        let mut io = IoContext::from_reader(cursor);
        assert_eq!(io.size(), Some(4));
        assert_eq!(io.read_u8().unwrap(), 7);
    }
}
