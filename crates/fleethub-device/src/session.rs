//! Registration handshake and the relay between stdin, the hub, and stdout.
//!
//! Two helper threads feed one channel: the command reader forwards whatever
//! the hub writes, and the input reader forwards status lines typed by the
//! operator. The calling thread owns the socket's write side and the output
//! stream, so neither helper touches them.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::TcpStream;
use std::sync::mpsc::{self, Sender};
use std::thread;
use std::time::Duration;

use super::AppError;

const ACCEPTED: &[u8] = b"ACCEPTED";
const DENIED: &[u8] = b"DENIED";
const REPLY_TIMEOUT: Duration = Duration::from_secs(5);
const READ_CHUNK: usize = 1024;

/// Command the hub sends to ask a device to restart its local state.
pub(crate) const RESET_COMMAND: &str = "RESET";

/// Registration payload announced with the device name.
pub(crate) const CONNECTED_PAYLOAD: &str = "CONNECTED";

/// Reply to the registration line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Reply {
    Accepted,
    Denied,
    Silent,
    Other(String),
}

/// Sends `name:CONNECTED` and waits for the hub's verdict.
pub(crate) fn register(stream: &mut TcpStream, name: &str) -> Result<(), AppError> {
    stream
        .write_all(format!("{name}:{CONNECTED_PAYLOAD}\n").as_bytes())
        .and_then(|()| stream.flush())
        .map_err(AppError::SendRegistration)?;
    stream
        .set_read_timeout(Some(REPLY_TIMEOUT))
        .map_err(AppError::ReadReply)?;
    let reply = read_reply(stream)?;
    stream.set_read_timeout(None).map_err(AppError::ReadReply)?;
    match reply {
        Reply::Accepted => Ok(()),
        Reply::Denied => Err(AppError::Denied {
            name: name.to_owned(),
        }),
        Reply::Silent => Err(AppError::NoReply),
        Reply::Other(text) => Err(AppError::UnexpectedReply(text)),
    }
}

/// Reads the reply byte by byte so a command sent right after `ACCEPTED`
/// stays in the socket for the command reader.
pub(crate) fn read_reply<R: Read>(reader: &mut R) -> Result<Reply, AppError> {
    let mut reply = Vec::with_capacity(ACCEPTED.len());
    let mut byte = [0_u8; 1];
    while reply.as_slice() != ACCEPTED {
        match reader.read(&mut byte) {
            Ok(0) => break,
            Ok(_) => reply.extend_from_slice(&byte),
            Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
            Err(error)
                if matches!(
                    error.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                ) =>
            {
                break;
            }
            Err(error) => return Err(AppError::ReadReply(error)),
        }
        if !ACCEPTED.starts_with(&reply) && !DENIED.starts_with(&reply) {
            break;
        }
    }
    Ok(match reply.as_slice() {
        ACCEPTED => Reply::Accepted,
        DENIED => Reply::Denied,
        [] => Reply::Silent,
        other => Reply::Other(String::from_utf8_lossy(other).into_owned()),
    })
}

enum Relay {
    Command(String),
    HubClosed,
    Status(String),
    InputClosed,
    InputFailed(io::Error),
}

/// How a relay session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Ending {
    InputClosed,
    HubClosed,
}

/// Relays stdin lines to the hub and hub commands to `stdout` until either
/// side closes.
pub(crate) fn relay<R, W>(
    stream: &mut TcpStream,
    name: &str,
    input: R,
    stdout: &mut W,
) -> Result<Ending, AppError>
where
    R: Read + Send + 'static,
    W: Write,
{
    let (sender, events) = mpsc::channel();
    let reader = stream.try_clone().map_err(AppError::SpawnReader)?;
    spawn_command_reader(reader, sender.clone())?;
    spawn_input_reader(input, sender)?;

    while let Ok(event) = events.recv() {
        match event {
            Relay::Command(text) => report_command(stdout, &text)?,
            Relay::Status(line) => {
                stream
                    .write_all(format!("{name}:{line}\n").as_bytes())
                    .and_then(|()| stream.flush())
                    .map_err(AppError::SendStatus)?;
            }
            Relay::HubClosed => {
                writeln!(stdout, "[device] the hub closed the connection")
                    .map_err(AppError::WriteOutput)?;
                return Ok(Ending::HubClosed);
            }
            Relay::InputClosed => return Ok(Ending::InputClosed),
            Relay::InputFailed(error) => return Err(AppError::ReadInput(error)),
        }
    }
    Ok(Ending::InputClosed)
}

fn report_command<W: Write>(stdout: &mut W, text: &str) -> Result<(), AppError> {
    writeln!(stdout, "[server] {text}").map_err(AppError::WriteOutput)?;
    if text.trim() == RESET_COMMAND {
        writeln!(stdout, "[device] reset requested; local state cleared")
            .map_err(AppError::WriteOutput)?;
    }
    Ok(())
}

fn spawn_command_reader(mut stream: TcpStream, sender: Sender<Relay>) -> Result<(), AppError> {
    thread::Builder::new()
        .name("hub-commands".to_owned())
        .spawn(move || {
            let mut buffer = [0_u8; READ_CHUNK];
            loop {
                match stream.read(&mut buffer) {
                    Ok(0) => break,
                    Ok(read) => {
                        let text = String::from_utf8_lossy(&buffer[..read]).into_owned();
                        if sender.send(Relay::Command(text)).is_err() {
                            return;
                        }
                    }
                    Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
                    Err(_) => break,
                }
            }
            let _ = sender.send(Relay::HubClosed);
        })
        .map(|_| ())
        .map_err(AppError::SpawnReader)
}

fn spawn_input_reader<R>(input: R, sender: Sender<Relay>) -> Result<(), AppError>
where
    R: Read + Send + 'static,
{
    thread::Builder::new()
        .name("status-input".to_owned())
        .spawn(move || {
            for line in BufReader::new(input).lines() {
                let event = match line {
                    Ok(line) if line.trim().is_empty() => continue,
                    Ok(line) => Relay::Status(line.trim_end_matches('\r').to_owned()),
                    Err(error) => {
                        let _ = sender.send(Relay::InputFailed(error));
                        return;
                    }
                };
                if sender.send(event).is_err() {
                    return;
                }
            }
            let _ = sender.send(Relay::InputClosed);
        })
        .map(|_| ())
        .map_err(AppError::SpawnReader)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(b"ACCEPTED".as_slice(), Reply::Accepted)]
    #[case(b"DENIED".as_slice(), Reply::Denied)]
    #[case(b"".as_slice(), Reply::Silent)]
    #[case(b"HELLO".as_slice(), Reply::Other("H".to_owned()))]
    #[case(b"DENY".as_slice(), Reply::Other("DENY".to_owned()))]
    fn replies_are_classified(#[case] bytes: &[u8], #[case] expected: Reply) {
        let mut reader = Cursor::new(bytes.to_vec());
        let reply = read_reply(&mut reader).expect("cursor reads never fail");
        assert_eq!(reply, expected);
    }

    #[test]
    fn accepted_leaves_trailing_command_unread() {
        let mut reader = Cursor::new(b"ACCEPTEDRESET".to_vec());

        let reply = read_reply(&mut reader).expect("read reply");

        assert_eq!(reply, Reply::Accepted);
        let mut rest = String::new();
        reader.read_to_string(&mut rest).expect("read remainder");
        assert_eq!(rest, "RESET");
    }

    #[rstest]
    #[case("RESET", true)]
    #[case("RESET\n", true)]
    #[case("STOP", false)]
    fn reset_commands_are_reported(#[case] command: &str, #[case] reset: bool) {
        let mut output = Vec::new();
        report_command(&mut output, command).expect("write to vec");
        let text = String::from_utf8(output).expect("utf8 output");
        assert!(text.starts_with("[server] "));
        assert_eq!(text.contains("reset requested"), reset);
    }
}
