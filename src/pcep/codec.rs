use byteorder::{NetworkEndian, ReadBytesExt};
use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder, Framed};

use super::header::{CommonHeader, MessageType, COMMON_HEADER_LEN};
use super::{Message, PcepError};

pub type MessageProtocol<T> = Framed<T, MessageCodec>;

/// Frames PCEP messages off a byte stream.
///
/// Partial messages stay buffered until `messageLength` bytes have arrived.
/// A complete frame whose body fails to decode is still consumed and handed
/// up as `Message::Malformed`, so one bad message never ends the stream.
#[derive(Debug, Default)]
pub struct MessageCodec;

impl MessageCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for MessageCodec {
    type Item = Message;
    type Error = PcepError;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, PcepError> {
        let length = match find_msg_length(buf)? {
            Some(length) => length,
            None => return Ok(None),
        };
        if buf.len() < length {
            buf.reserve(length - buf.len());
            return Ok(None);
        }
        let frame = buf.split_to(length);
        let kind = MessageType::from(frame[1]);
        let message = CommonHeader::decode(&frame)
            .and_then(|header| Message::decode(&header, &frame[COMMON_HEADER_LEN..]));
        Ok(Some(
            message.unwrap_or_else(|err| Message::Malformed(kind, err)),
        ))
    }
}

impl Encoder<Message> for MessageCodec {
    type Error = PcepError;

    fn encode(&mut self, message: Message, buf: &mut BytesMut) -> Result<(), PcepError> {
        message.encode(buf)
    }
}

/// Given a stream of bytes, find the length of the next PCEP message
fn find_msg_length(data: &[u8]) -> Result<Option<usize>, PcepError> {
    if data.len() < COMMON_HEADER_LEN {
        return Ok(None);
    }
    let mut length_field = &data[2..4];
    let length = length_field.read_u16::<NetworkEndian>()? as usize;
    if length < COMMON_HEADER_LEN {
        // Nothing after this can be framed
        return Err(PcepError::InvalidField(format!(
            "message length {} is shorter than the common header",
            length
        )));
    }
    Ok(Some(length))
}

#[cfg(test)]
mod tests {
    use futures::{SinkExt, StreamExt};
    use tokio::io::AsyncWriteExt;

    use super::*;
    use crate::pcep::{CloseObject, OpenObject};

    #[test]
    fn test_find_msg_length() {
        assert_eq!(find_msg_length(&[32, 2, 0, 4]).unwrap(), Some(4));
        assert_eq!(find_msg_length(&[32, 2, 0]).unwrap(), None);
        assert!(find_msg_length(&[32, 2, 0, 3]).is_err());
    }

    #[test]
    fn test_decode_multiple() {
        let mut codec = MessageCodec::new();
        let mut buf = BytesMut::from(&[32, 2, 0, 4, 32, 7, 0, 12, 15, 0x10, 0, 8, 0, 0, 0, 2][..]);
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(Message::Keepalive));
        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some(Message::Close(CloseObject::new(2)))
        );
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_decode_partial() {
        let mut codec = MessageCodec::new();
        let mut full = BytesMut::new();
        Message::Open(OpenObject::local(30, 120, 1))
            .encode(&mut full)
            .unwrap();
        let mut buf = BytesMut::from(&full[..10]);
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        buf.extend_from_slice(&full[10..]);
        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some(Message::Open(OpenObject::local(30, 120, 1)))
        );
    }

    #[test]
    fn test_decode_malformed_survives() {
        let mut codec = MessageCodec::new();
        // Version 2 keepalive, then a valid keepalive
        let mut buf = BytesMut::from(&[64, 2, 0, 4, 32, 2, 0, 4][..]);
        match codec.decode(&mut buf).unwrap() {
            Some(Message::Malformed(_, PcepError::BadVersion(2))) => (),
            other => panic!("Expected malformed message, got {:?}", other),
        }
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(Message::Keepalive));
    }

    #[tokio::test]
    async fn test_framed_split_writes() {
        let (client, server) = tokio::io::duplex(64);
        let mut framed = MessageProtocol::new(server, MessageCodec::new());
        let mut client = client;
        let mut full = BytesMut::new();
        Message::Open(OpenObject::local(30, 120, 9))
            .encode(&mut full)
            .unwrap();
        Message::Keepalive.encode(&mut full).unwrap();
        client.write_all(&full[..5]).await.unwrap();
        client.flush().await.unwrap();
        tokio::task::yield_now().await;
        client.write_all(&full[5..]).await.unwrap();

        match framed.next().await {
            Some(Ok(Message::Open(open))) => assert_eq!(open.session_id, 9),
            other => panic!("Expected OPEN, got {:?}", other),
        }
        assert_eq!(framed.next().await.unwrap().unwrap(), Message::Keepalive);

        framed.send(Message::Keepalive).await.unwrap();
        let mut reply = [0u8; 4];
        tokio::io::AsyncReadExt::read_exact(&mut client, &mut reply)
            .await
            .unwrap();
        assert_eq!(reply, [32, 2, 0, 4]);
    }
}
