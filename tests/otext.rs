use mpc_engine::{
    channel::SimpleChannel,
    ot::{
        chou_orlandi,
        extend::{ExtendReceiver, ExtendSender},
    },
    Error,
};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

fn two_channels() -> (SimpleChannel, SimpleChannel) {
    let mut channels = SimpleChannel::channels(2);
    let ch1 = channels.pop().unwrap();
    let ch0 = channels.pop().unwrap();
    (ch0, ch1)
}

#[tokio::test(flavor = "multi_thread")]
async fn receiver_obtains_exactly_the_chosen_messages() {
    let (ch0, ch1) = two_channels();
    let sender = tokio::spawn(async move {
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let mut ot =
            ExtendSender::<chou_orlandi::Receiver>::new(&ch0, &mut rng, 1, 128, 128, 128).await?;
        for j in 0..128u32 {
            let m0 = [j as u8; 16];
            let m1 = [j as u8 ^ 0xff; 16];
            ot.send(&ch0, &mut rng, &m0, &m1).await?;
        }
        Ok::<_, Error>(())
    });
    let receiver = tokio::spawn(async move {
        let mut rng = ChaCha20Rng::seed_from_u64(2);
        let mut ot =
            ExtendReceiver::<chou_orlandi::Sender>::new(&ch1, &mut rng, 0, 128, 128, 128).await?;
        let mut received = Vec::new();
        for j in 0..128 {
            received.push(ot.receive(&ch1, &mut rng, j == 0).await?);
        }
        Ok::<_, Error>(received)
    });
    sender.await.unwrap().unwrap();
    let received = receiver.await.unwrap().unwrap();
    assert_eq!(received[0], vec![0xff; 16]);
    for (j, w) in received.iter().enumerate().skip(1) {
        assert_eq!(w, &vec![j as u8; 16], "transfer {j} returned the wrong message");
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn exhausting_a_batch_triggers_preprocessing_again() {
    let (ch0, ch1) = two_channels();
    let transfers = 9;
    let sender = tokio::spawn(async move {
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        let mut ot =
            ExtendSender::<chou_orlandi::Receiver>::new(&ch0, &mut rng, 1, 128, 128, 8).await?;
        for j in 0..transfers {
            let m0 = [2 * j as u8; 16];
            let m1 = [2 * j as u8 + 1; 16];
            ot.send(&ch0, &mut rng, &m0, &m1).await?;
        }
        Ok::<_, Error>(())
    });
    let receiver = tokio::spawn(async move {
        let mut rng = ChaCha20Rng::seed_from_u64(4);
        let mut ot =
            ExtendReceiver::<chou_orlandi::Sender>::new(&ch1, &mut rng, 0, 128, 128, 8).await?;
        let mut received = Vec::new();
        for j in 0..transfers {
            received.push(ot.receive(&ch1, &mut rng, j % 2 == 1).await?);
        }
        Ok::<_, Error>(received)
    });
    sender.await.unwrap().unwrap();
    let received = receiver.await.unwrap().unwrap();
    for (j, w) in received.iter().enumerate() {
        let expected = 2 * j as u8 + (j % 2) as u8;
        assert_eq!(w, &vec![expected; 16], "transfer {j} returned the wrong message");
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn parameters_that_are_no_multiple_of_8_are_rejected() {
    let (ch0, ch1) = two_channels();
    let mut rng = ChaCha20Rng::seed_from_u64(5);
    let result =
        ExtendSender::<chou_orlandi::Receiver>::new(&ch0, &mut rng, 1, 128, 100, 128).await;
    assert!(matches!(result, Err(Error::InvalidSize(100))));
    let result = ExtendReceiver::<chou_orlandi::Sender>::new(&ch1, &mut rng, 0, 12, 128, 128).await;
    assert!(matches!(result, Err(Error::InvalidSize(12))));
    let result = ExtendSender::<chou_orlandi::Receiver>::new(&ch0, &mut rng, 1, 128, 128, 0).await;
    assert!(matches!(result, Err(Error::InvalidSize(0))));
}

#[tokio::test(flavor = "multi_thread")]
async fn message_length_must_match_the_configured_width() {
    let (ch0, ch1) = two_channels();
    let sender = tokio::spawn(async move {
        let mut rng = ChaCha20Rng::seed_from_u64(6);
        let mut ot =
            ExtendSender::<chou_orlandi::Receiver>::new(&ch0, &mut rng, 1, 128, 128, 8).await?;
        let short = [0u8; 8];
        let full = [0u8; 16];
        assert!(matches!(
            ot.send(&ch0, &mut rng, &short, &full).await,
            Err(Error::InvalidSize(64))
        ));
        Ok::<_, Error>(())
    });
    let receiver = tokio::spawn(async move {
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        ExtendReceiver::<chou_orlandi::Sender>::new(&ch1, &mut rng, 0, 128, 128, 8).await?;
        Ok::<_, Error>(())
    });
    sender.await.unwrap().unwrap();
    receiver.await.unwrap().unwrap();
}
