use crate::math::tensor::Tensor3;

/// Averages every channel over all spatial positions, producing one value per
/// channel.
pub fn global_average_pool(input: &Tensor3) -> Vec<f32> {
    let mut sums = vec![0.0f32; input.channels];
    for px in input.data.chunks_exact(input.channels.max(1)) {
        for (s, v) in sums.iter_mut().zip(px) {
            *s += v;
        }
    }
    let n = (input.height * input.width).max(1) as f32;
    sums.iter_mut().for_each(|s| *s /= n);
    sums
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn averages_each_channel_separately() {
        let t = Tensor3::from_data(1, 2, 2, vec![1.0, 10.0, 3.0, 30.0]).unwrap();
        assert_eq!(global_average_pool(&t), vec![2.0, 20.0]);
    }
}
