//! TCP server: accepts connections, wires each to the dispatcher, and
//! runs the background expirer.
use crate::codec::RespCodec;
use crate::config::Config;
use crate::connection::Connections;
use crate::db::Databases;
use crate::dispatcher::{self, Dispatch};
use crate::pubsub::Pubsub;
use futures::SinkExt;
use log::{debug, info, trace, warn};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::sleep;
use tokio_stream::StreamExt;
use tokio_util::codec::Framed;

/// Interval between active-expiry sweeps across all DBs.
const EXPIRE_INTERVAL: Duration = Duration::from_secs(5);

/// Runs the periodic expirer: wakes every [`EXPIRE_INTERVAL`] and purges
/// lapsed keys from every DB. Lazy reads make this non-load-bearing for
/// correctness; it only bounds memory held by keys nobody has read since
/// they expired.
async fn run_expirer(dbs: Arc<Databases>) {
    loop {
        sleep(EXPIRE_INTERVAL).await;
        let now = Instant::now();
        let mut total = 0usize;
        for (_, db) in dbs.iter() {
            total += db.purge(now);
        }
        if total > 0 {
            trace!("expirer swept {} expired key(s)", total);
        }
    }
}

/// Drives one accepted connection: a `select!` loop between the next
/// parsed command and this connection's pub/sub outbound queue, writing
/// whichever is ready to the single socket sink. This is the single
/// writer the spec calls for -- it serializes command responses and
/// published messages in the order each becomes ready.
async fn handle_connection(socket: TcpStream, conns: Arc<Connections>) {
    let peer = match socket.peer_addr() {
        Ok(addr) => addr,
        Err(err) => {
            warn!("could not read peer address: {}", err);
            return;
        }
    };
    let (mut outbound, conn) = conns.new_connection(peer);
    info!("connection {} accepted from {}", conn.id(), peer);

    let mut transport = Framed::new(socket, RespCodec);

    loop {
        tokio::select! {
            Some(msg) = outbound.recv() => {
                if transport.send(msg).await.is_err() {
                    break;
                }
            }
            frame = transport.next() => {
                match frame {
                    Some(Ok(args)) => {
                        match dispatcher::dispatch(&conns, &conn, args) {
                            Dispatch::Reply(value) => {
                                if transport.send(value).await.is_err() {
                                    break;
                                }
                            }
                            Dispatch::Close(value) => {
                                let _ = transport.send(value).await;
                                break;
                            }
                        }
                    }
                    Some(Err(err)) => {
                        warn!("connection {} protocol error: {}", conn.id(), err);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    conns.pubsub().disconnect(conn.id());
    conns.remove(conn.id());
    info!("connection {} ({}) closed", conn.id(), peer);
}

async fn accept_loop(listener: TcpListener, conns: Arc<Connections>) {
    loop {
        match listener.accept().await {
            Ok((socket, _addr)) => {
                let conns = conns.clone();
                tokio::spawn(async move {
                    handle_connection(socket, conns).await;
                });
            }
            Err(err) => {
                debug!("error accepting connection: {}", err);
            }
        }
    }
}

/// Builds the shared state and runs the server until the process is
/// interrupted. Binds the listener before returning `Ok`, so a caller
/// can tell a successful start from a fatal bind failure.
pub async fn serve(config: Config) -> std::io::Result<()> {
    let dbs = Arc::new(Databases::new(config.databases));
    let pubsub = Arc::new(Pubsub::new());
    let conns = Connections::new(dbs.clone(), pubsub);

    tokio::spawn(run_expirer(dbs));

    let addr = config.addr();
    let listener = TcpListener::bind(&addr).await?;
    info!("listening on {}", addr);

    accept_loop(listener, conns).await;
    Ok(())
}
