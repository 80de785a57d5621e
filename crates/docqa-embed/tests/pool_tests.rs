use candle_core::{DType, Device, Tensor};
use docqa_embed::masked_mean_l2;
use docqa_embed::tokenize::{pack_encodings, PAD_ID};

#[test]
fn masked_mean_l2_basic() {
    let dev = Device::Cpu;
    // Two tokens with hidden dim 4; second token is masked out.
    let h = Tensor::from_slice(&[1.0f32, 2.0, 3.0, 4.0,  // token 0
                                 5.0, 6.0, 7.0, 8.0],    // token 1
                               (1, 2, 4), &dev).unwrap();
    let mask = Tensor::from_slice(&[1i64, 0i64], (1, 2), &dev).unwrap()
        .to_dtype(DType::F32).unwrap();
    let out = masked_mean_l2(&h, &mask).unwrap();
    let v: Vec<Vec<f32>> = out.to_vec2().unwrap();
    let v = &v[0];
    let norm: f32 = (1.0f32*1.0 + 2.0*2.0 + 3.0*3.0 + 4.0*4.0).sqrt();
    let expected = [1.0/norm, 2.0/norm, 3.0/norm, 4.0/norm];
    for (a,b) in v.iter().cloned().zip(expected) {
        assert!((a - b).abs() < 1e-5, "a={} b={}", a, b);
    }
}

#[test]
fn masked_mean_l2_rejects_rank_two_input() {
    let dev = Device::Cpu;
    let h = Tensor::zeros((2, 4), DType::F32, &dev).unwrap();
    let mask = Tensor::ones((2, 1), DType::F32, &dev).unwrap();
    assert!(masked_mean_l2(&h, &mask).is_err());
}

#[test]
fn pack_pads_to_longest_and_truncates() {
    let dev = Device::Cpu;
    let short = tokenizers::Encoding::new(vec![0, 5, 2], vec![0; 3], vec![String::new(); 3], vec![None; 3], vec![(0, 0); 3], vec![0; 3], vec![1; 3], vec![], Default::default());
    let long = tokenizers::Encoding::new(vec![0, 7, 8, 9, 2], vec![0; 5], vec![String::new(); 5], vec![None; 5], vec![(0, 0); 5], vec![0; 5], vec![1; 5], vec![], Default::default());

    let (ids, mask) = pack_encodings(&[short, long], 4, &dev).unwrap();
    assert_eq!(ids.dims(), &[2, 4]);
    let ids: Vec<Vec<u32>> = ids.to_vec2().unwrap();
    let mask: Vec<Vec<u32>> = mask.to_vec2().unwrap();
    assert_eq!(ids[0], vec![0, 5, 2, PAD_ID]);
    assert_eq!(mask[0], vec![1, 1, 1, 0]);
    assert_eq!(ids[1], vec![0, 7, 8, 9]);
    assert_eq!(mask[1], vec![1, 1, 1, 1]);
}
