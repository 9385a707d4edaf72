use std::borrow::Cow;

use comms::{
    msg::{Command, Msg, Payload},
    specs::PipelineSizes,
};
use tokio::io;

#[tokio::test]
async fn frames_round_trip_over_duplex() -> io::Result<()> {
    let (a, b) = io::duplex(1024);
    let (a_rx, a_tx) = io::split(a);
    let (b_rx, b_tx) = io::split(b);

    let (_, mut tx) = comms::channel(a_rx, a_tx);
    let (mut rx, _) = comms::channel(b_rx, b_tx);

    let sizes = PipelineSizes {
        nlayers: 4,
        nspecies: 2,
        nwave: 8,
        nbands: 1,
        niter: 3,
        nfree: 6,
    };
    let spectrum: Vec<f64> = (0..8).map(|i| i as f64 * 0.5).collect();

    let sender = tokio::spawn(async move {
        tx.send(&Msg::Control(Command::Sizes(sizes))).await?;
        tx.send(&Msg::Data(Payload::Spectrum(&spectrum))).await?;
        tx.send(&Msg::Err(Cow::Borrowed("bad filter"))).await?;
        io::Result::Ok(())
    });

    let mut buf: Vec<f64> = Vec::new();

    let msg: Msg = rx.recv_into(&mut buf).await?;
    assert_eq!(msg, Msg::Control(Command::Sizes(sizes)));

    let msg: Msg = rx.recv_into(&mut buf).await?;
    match msg {
        Msg::Data(Payload::Spectrum(values)) => {
            assert_eq!(values, [0.0, 0.5, 1.0, 1.5, 2.0, 2.5, 3.0, 3.5]);
        }
        other => panic!("expected a spectrum, got {other:?}"),
    }

    let msg: Msg = rx.recv_into(&mut buf).await?;
    assert_eq!(msg, Msg::Err(Cow::Borrowed("bad filter")));

    sender.await??;
    Ok(())
}

#[tokio::test]
async fn closed_writer_surfaces_eof() {
    let (a, b) = io::duplex(64);
    drop(a);
    let (b_rx, b_tx) = io::split(b);
    let (mut rx, _) = comms::channel(b_rx, b_tx);

    let mut buf: Vec<f64> = Vec::new();
    let err = rx.recv_into::<Msg, _>(&mut buf).await.unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
}

#[tokio::test]
async fn stray_text_is_rejected_as_an_oversized_frame() {
    use tokio::io::AsyncWriteExt;

    let (mut a, b) = io::duplex(64);
    let (b_rx, b_tx) = io::split(b);
    let (rx, _) = comms::channel(b_rx, b_tx);
    let mut rx = rx.with_max_frame(1 << 20);

    // a solver printing to stdout instead of speaking the protocol
    a.write_all(b"loading opacity tables...\n").await.unwrap();

    let mut buf: Vec<f64> = Vec::new();
    let err = rx.recv_into::<Msg, _>(&mut buf).await.unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    assert!(buf.is_empty());
}
