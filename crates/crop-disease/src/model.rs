use burn::config::Config;
use burn::module::Module;
use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig, MaxPool2d, MaxPool2dConfig};
use burn::nn::{Dropout, DropoutConfig, Linear, LinearConfig, PaddingConfig2d, Relu};
use burn::prelude::{Backend, Tensor};
use burn::tensor::activation::softmax;

/// Convolutional leaf classifier. Takes `[batch, 3, height, width]` images scaled to `[0, 1]`.
#[derive(Debug, Module)]
pub struct LeafNet<B: Backend> {
	activation: Relu,
	dropout: Dropout,
	pool: MaxPool2d,
	conv1: Conv2d<B>,
	conv2: Conv2d<B>,
	conv3: Conv2d<B>,
	conv4: Conv2d<B>,
	global_pool: AdaptiveAvgPool2d,
	fc1: Linear<B>,
	fc2: Linear<B>,
}

impl <B: Backend> LeafNet<B> {
	/// Returns logits `[batch, num_classes]`.
	pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
		let x = self.conv1.forward(images);
		let x = self.activation.forward(x);
		let x = self.pool.forward(x);

		let x = self.conv2.forward(x);
		let x = self.activation.forward(x);
		let x = self.pool.forward(x);

		let x = self.conv3.forward(x);
		let x = self.activation.forward(x);
		let x = self.pool.forward(x);

		let x = self.conv4.forward(x);
		let x = self.activation.forward(x);

		let x = self.global_pool.forward(x); // [B, C, 1, 1]
		let x = x.flatten(1, 3);

		let x = self.fc1.forward(x);
		let x = self.activation.forward(x);
		let x = self.dropout.forward(x);

		self.fc2.forward(x)
	}

	/// Softmax over the class dimension.
	pub fn probabilities(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
		softmax(self.forward(images), 1)
	}
}

#[derive(Debug, Config)]
pub struct LeafNetConfig {
	pub num_classes: usize,
	#[config(default = 32)]
	pub base_channels: usize,
	#[config(default = 256)]
	pub hidden_size: usize,
	#[config(default = 0.5)]
	pub dropout: f64,
}

impl LeafNetConfig {
	pub fn init<B: Backend>(&self, device: &B::Device) -> LeafNet<B> {
		let c = self.base_channels;

		let conv = |channels: [usize; 2]| {
			Conv2dConfig::new(channels, [3, 3])
				.with_padding(PaddingConfig2d::Same)
				.init(device)
		};

		LeafNet {
			activation: Relu::new(),
			dropout: DropoutConfig::new(self.dropout).init(),
			pool: MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
			conv1: conv([3, c]),
			conv2: conv([c, c * 2]),
			conv3: conv([c * 2, c * 4]),
			conv4: conv([c * 4, c * 8]),
			global_pool: AdaptiveAvgPool2dConfig::new([1, 1]).init(),
			fc1: LinearConfig::new(c * 8, self.hidden_size).init(device),
			fc2: LinearConfig::new(self.hidden_size, self.num_classes).init(device),
		}
	}
}
